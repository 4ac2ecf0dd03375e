/// Transport configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Hostname to bind to
    pub hostname: String,
    /// Port to listen on (0 for OS-assigned)
    pub port: u16,
    /// Enable permissive CORS
    pub enable_cors: bool,
    /// Largest body accepted, in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: "127.0.0.1".into(),
            port: 8080,
            enable_cors: false,
            max_body_size: 1024 * 1024,
        }
    }
}
