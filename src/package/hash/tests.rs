use super::*;

#[test]
fn test_hex_roundtrip_preserves_bytes() {
    let hash = ContentHash::of(b"left-pad");
    let hex = hash.to_hex();
    assert_eq!(hex.len(), 64);
    assert_eq!(ContentHash::from_hex(&hex), Some(hash));
}

#[test]
fn test_from_hex_rejects_bad_input() {
    assert!(ContentHash::from_hex("abc").is_none());
    assert!(ContentHash::from_hex(&"g".repeat(64)).is_none());
    assert!(ContentHash::from_hex(&"a".repeat(63)).is_none());
    assert!(ContentHash::from_hex(&"A".repeat(64)).is_some());
}

#[test]
fn test_from_str_reports_invalid_hash() {
    let err = "not-a-hash".parse::<ContentHash>().unwrap_err();
    assert!(matches!(err, Error::InvalidHash(ref s) if s == "not-a-hash"));
    let ok: ContentHash = format!("  {}\n", "0".repeat(64)).parse().unwrap();
    assert_eq!(ok, ContentHash([0u8; 32]));
}

#[test]
fn test_of_parts_matches_concatenation() {
    assert_eq!(
        ContentHash::of_parts(&[b"blob\0", b"payload"]),
        ContentHash::of(b"blob\0payload")
    );
}

#[test]
fn test_display_is_full_hex_and_debug_is_short() {
    let hash = ContentHash::of(b"x");
    assert_eq!(hash.to_string(), hash.to_hex());
    let debug = format!("{:?}", hash);
    assert!(debug.starts_with('#'));
    assert_eq!(debug.len(), 9);
    assert_eq!(&debug[1..], hash.to_short());
}

#[test]
fn test_serde_uses_hex_string() {
    let hash = ContentHash::of(b"serde");
    let json = serde_json::to_string(&hash).unwrap();
    assert_eq!(json, format!("\"{}\"", hash.to_hex()));
    let back: ContentHash = serde_json::from_str(&json).unwrap();
    assert_eq!(back, hash);
    assert!(serde_json::from_str::<ContentHash>("\"QmNotHex\"").is_err());
}
