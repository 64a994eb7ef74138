use super::*;

#[test]
fn exit_code_mapping() {
    assert_eq!(AppError::user("bad_input", "oops").exit_code(), 2);
    assert_eq!(AppError::not_found("no_route", "missing").exit_code(), 3);
    assert_eq!(AppError::config("bad_path", "no slash").exit_code(), 4);
    assert_eq!(AppError::storage("io_error", "disk").exit_code(), 5);
    assert_eq!(AppError::parse("json_error", "eof").exit_code(), 5);
    assert_eq!(AppError::network("http_status", "503").exit_code(), 6);
    assert_eq!(AppError::provider("init", "bad authority").exit_code(), 7);
    assert_eq!(AppError::internal("internal", "panic").exit_code(), 1);
}

#[test]
fn display_joins_code_and_message() {
    let e = AppError::parse("json_error", "expected value at line 1");
    assert_eq!(e.to_string(), "json_error: expected value at line 1");
    assert_eq!(e.code_str(), "json_error");
    assert_eq!(e.message(), "expected value at line 1");
}

#[test]
fn conversions_pick_expected_variant() {
    let io: AppError = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
    assert!(matches!(io, AppError::Storage { .. }));
    assert!(io.is_transient());

    let json: AppError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
    assert!(matches!(json, AppError::Parse { .. }));
    assert!(!json.is_transient());

    let any: AppError = anyhow::anyhow!("boom").into();
    assert_eq!(any.code_str(), "internal_error");
}

#[test]
fn serializes_with_type_tag() {
    let v = serde_json::to_value(AppError::network("timeout", "slow")).unwrap();
    assert_eq!(v["type"], "network");
    assert_eq!(v["code"], "timeout");
}
