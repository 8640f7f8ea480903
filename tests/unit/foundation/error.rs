use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        FxError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        FxError::allocation("x")
            .to_string()
            .contains("allocation error:")
    );
    assert!(FxError::decode("x").to_string().contains("decode error:"));
    assert!(FxError::config("x").to_string().contains("config error:"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("disk gone");
    let err = FxError::Other(anyhow::Error::new(base).context("reading picture"));
    assert!(err.to_string().contains("reading picture"));
}
