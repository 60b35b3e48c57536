//! Verify URL derivation and URL assignment against the JSON vectors in
//! `test-vectors/`.

use druid_connection::{Connection, Protocol};
use serde::Deserialize;

#[derive(Deserialize)]
struct Vectors<T> {
    cases: Vec<T>,
}

#[derive(Deserialize)]
struct Fields {
    protocol: String,
    host: String,
    port: Option<u16>,
    path: String,
}

#[derive(Deserialize)]
struct BuildCase {
    name: String,
    input: Fields,
    expected_url: Option<String>,
}

#[derive(Deserialize)]
struct Expected {
    protocol: Protocol,
    host: String,
    path: String,
    port: Option<u16>,
}

#[derive(Deserialize)]
struct SetUrlCase {
    name: String,
    url: String,
    expected: Option<Expected>,
    expected_error: Option<String>,
}

// ---------------------------------------------------------------------------
// build_url
// ---------------------------------------------------------------------------

#[test]
fn build_url_test_vectors() {
    let raw = include_str!("../../test-vectors/build_url.json");
    let vectors: Vectors<BuildCase> = serde_json::from_str(raw).unwrap();

    for case in vectors.cases {
        let name = &case.name;
        let mut connection = Connection::new();
        connection
            .set_protocol(&case.input.protocol)
            .set_host(case.input.host)
            .set_port(case.input.port)
            .set_path(case.input.path);

        let url = connection.build_url().to_string();

        match case.expected_url {
            Some(expected) => {
                assert_eq!(url, expected, "{name}: url");
                assert!(connection.error_messages().is_empty(), "{name}: diagnostics");
            }
            None => {
                assert_eq!(url, "", "{name}: url should stay empty");
                assert_eq!(connection.error_messages().len(), 1, "{name}: diagnostics");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// set_url
// ---------------------------------------------------------------------------

#[test]
fn set_url_test_vectors() {
    let raw = include_str!("../../test-vectors/set_url.json");
    let vectors: Vectors<SetUrlCase> = serde_json::from_str(raw).unwrap();

    for case in vectors.cases {
        let name = &case.name;
        let mut connection = Connection::new();
        let result = connection.set_url(&case.url).map(|_| ());

        if let Some(expected_error) = case.expected_error {
            assert!(result.is_err(), "{name}: expected rejection");
            assert_eq!(connection.url(), "", "{name}: url");
            assert_eq!(connection.error_messages(), vec![expected_error], "{name}: diagnostics");
        } else {
            let expected = case.expected.unwrap();
            assert!(result.is_ok(), "{name}: expected acceptance");
            assert_eq!(connection.url(), case.url, "{name}: url");
            assert_eq!(connection.protocol(), expected.protocol, "{name}: protocol");
            assert_eq!(connection.host(), expected.host, "{name}: host");
            assert_eq!(connection.path(), expected.path, "{name}: path");
            assert_eq!(connection.port(), expected.port, "{name}: port");
        }
    }
}
