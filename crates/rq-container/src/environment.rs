//! Runtime environment the container was built for.

/// Variable read by [`Environment::detect`].
pub const ENV_VAR: &str = "REQSCOPE_ENV";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub name: String,
    pub is_release: bool,
}

impl Environment {
    pub fn development() -> Self {
        Self {
            name: "development".into(),
            is_release: false,
        }
    }

    pub fn testing() -> Self {
        Self {
            name: "testing".into(),
            is_release: false,
        }
    }

    pub fn production() -> Self {
        Self {
            name: "production".into(),
            is_release: true,
        }
    }

    /// Read `REQSCOPE_ENV` (`dev`, `test`, `prod` or a custom name).
    /// Defaults to development.
    pub fn detect() -> Self {
        match std::env::var(ENV_VAR) {
            Ok(name) => Self::named(&name),
            Err(_) => Self::development(),
        }
    }

    pub fn named(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "dev" | "development" => Self::development(),
            "test" | "testing" => Self::testing(),
            "prod" | "production" => Self::production(),
            other => Self {
                name: other.to_string(),
                is_release: false,
            },
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::development()
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
