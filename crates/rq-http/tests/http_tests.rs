//! Message layer tests — targets, headers, media types, responses, errors.

#[cfg(test)]
mod tests {
    use rq_http::*;
    use serde_json::json;

    // ─────────────────────────────────────────────────────────────────────
    // HttpMessage
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn target_splits_path_and_query() {
        let msg = HttpMessage::new(Method::Get, "/users/42?sort=asc&limit=5");
        assert_eq!(msg.path, "/users/42");
        assert_eq!(msg.query(), Some("sort=asc&limit=5"));
        assert_eq!(msg.target(), "/users/42?sort=asc&limit=5");
    }

    #[test]
    fn target_without_question_mark_has_no_query() {
        let msg = HttpMessage::new(Method::Get, "/plain");
        assert_eq!(msg.query(), None);

        let empty = HttpMessage::new(Method::Get, "/plain?");
        assert_eq!(empty.query(), Some(""));
    }

    #[test]
    fn path_is_normalized_to_leading_slash() {
        let msg = HttpMessage::new(Method::Get, "relative");
        assert_eq!(msg.path, "/relative");
    }

    #[test]
    fn headers_are_case_insensitive() {
        let mut msg = HttpMessage::new(Method::Post, "/")
            .with_header("X-Trace", "a")
            .with_header("x-trace", "b");
        assert_eq!(msg.header("X-TRACE"), Some("a"));

        msg.set_header("x-Trace", "c");
        assert_eq!(msg.headers().len(), 1);
        assert_eq!(msg.header("x-trace"), Some("c"));

        msg.remove_header("X-TRACE");
        assert!(msg.header("x-trace").is_none());
    }

    #[test]
    fn set_header_keeps_position_and_drops_duplicates() {
        let mut msg = HttpMessage::new(Method::Post, "/x")
            .with_header("content-type", "text/plain")
            .with_header("x-trace", "1")
            .with_header("Content-Type", "text/html");
        msg.set_media_type(Some(MediaType::plain_text()));
        assert_eq!(
            msg.headers(),
            &[
                ("content-type".to_string(), "text/plain; charset=utf-8".to_string()),
                ("x-trace".to_string(), "1".to_string()),
            ]
        );

        msg.set_header("accept", "*/*");
        assert_eq!(msg.headers().last().unwrap().0, "accept");
    }

    #[test]
    fn media_type_follows_content_type_header() {
        let mut msg = HttpMessage::new(Method::Post, "/").with_body("{}", MediaType::json());
        assert!(msg.media_type().unwrap().matches(&MediaType::json()));

        msg.set_media_type(None);
        assert!(msg.media_type().is_none());

        msg.set_header("Content-Type", "garbage");
        assert!(msg.media_type().is_none());
    }

    #[test]
    fn display_renders_request_line_headers_and_body() {
        let msg = HttpMessage::new(Method::Put, "/a?b=1")
            .with_header("Host", "example.test")
            .with_body("payload", MediaType::plain_text());
        let text = msg.to_string();
        assert!(text.starts_with("PUT /a?b=1 HTTP/1.1"));
        assert!(text.contains("\nHost: example.test"));
        assert!(text.ends_with("\n\npayload"));
    }

    #[test]
    fn debug_hides_body_bytes() {
        let msg = HttpMessage::new(Method::Post, "/").with_body("secret", MediaType::plain_text());
        let debug = format!("{msg:?}");
        assert!(debug.contains("<6 bytes>"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn method_parse_is_case_insensitive() {
        assert_eq!(Method::parse("get"), Method::Get);
        assert_eq!(Method::parse("DELETE").as_str(), "DELETE");
    }

    // ─────────────────────────────────────────────────────────────────────
    // MediaType
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn media_type_parses_parameters() {
        let media: MediaType = "Application/JSON; charset=\"UTF-8\"".parse().unwrap();
        assert_eq!(media.kind(), "application");
        assert_eq!(media.subtype(), "json");
        assert_eq!(media.parameter("CHARSET"), Some("UTF-8"));
    }

    #[test]
    fn media_type_matching_ignores_parameters() {
        let bare = MediaType::new("application", "json");
        assert!(bare.matches(&MediaType::json()));
        assert_ne!(bare, MediaType::json());
        assert!(MediaType::new("text", "*").matches(&MediaType::plain_text()));
        assert!(!MediaType::json().matches(&MediaType::plain_text()));
    }

    #[test]
    fn media_type_rejects_malformed() {
        assert!("json".parse::<MediaType>().is_err());
        assert!("application/".parse::<MediaType>().is_err());
        assert!("text/plain; charset".parse::<MediaType>().is_err());
    }

    #[test]
    fn media_type_display() {
        assert_eq!(MediaType::json().to_string(), "application/json; charset=utf-8");
    }

    // ─────────────────────────────────────────────────────────────────────
    // Status / Abort / Diagnostic
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn status_codes_map_both_ways() {
        assert_eq!(Status::UnsupportedMediaType.code(), 415);
        assert_eq!(Status::from_code(503), Status::ServiceUnavailable);
        assert_eq!(Status::from_code(418), Status::Custom(418));
        assert!(Status::Created.is_success());
        assert!(!Status::NotFound.is_success());
    }

    #[test]
    fn diagnostic_records_call_site() {
        let diagnostic = Diagnostic::new("defaultDB", "no default")
            .with_possible_causes(["nothing configured"])
            .with_suggested_fixes(["configure one", "pass one explicitly"]);
        let source = diagnostic.source.as_ref().unwrap();
        assert!(source.file.ends_with("http_tests.rs"));
        assert_eq!(diagnostic.suggested_fixes.len(), 2);

        let value = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(value["identifier"], "defaultDB");
        assert_eq!(value["possibleCauses"], json!(["nothing configured"]));
        assert!(value["suggestedFixes"].is_array());
    }

    #[test]
    fn diagnostic_becomes_internal_abort_with_data() {
        let abort = Abort::from(Diagnostic::new("x", "broken"));
        assert_eq!(abort.status(), Status::InternalServerError);
        assert_eq!(abort.message, "broken");
        assert_eq!(abort.data.unwrap()["identifier"], "x");
    }

    // ─────────────────────────────────────────────────────────────────────
    // Response
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn response_json_sets_content_type() {
        let response = Response::json(&json!({"ok": true})).unwrap();
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.header("Content-Type"), Some("application/json; charset=utf-8"));
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["ok"], true);
    }

    #[test]
    fn response_with_body_replaces_content_type() {
        let response = Response::text("hi").with_body("{}", MediaType::json());
        let content_types: Vec<_> = response
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .collect();
        assert_eq!(content_types.len(), 1);
    }

    #[test]
    fn abort_becomes_error_response() {
        let response = Response::from(Abort::bad_request("nope").with_data(json!({"field": "q"})));
        assert_eq!(response.status, 400);
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["error"]["message"], "nope");
        assert_eq!(body["error"]["data"]["field"], "q");
    }
}
