use davlink::services::webdav::url_management::{
    all_ancestors, decode_path, encode_path, join_url, normalise_path, relative_to,
};

#[test]
fn test_normalise_encode_decode_is_stable() {
    let samples = [
        "/",
        "",
        "a/b",
        "//nested///dir//",
        "/with space/and%percent",
        "/unicode/Übersicht/日本語.txt",
        "/trailing/",
        "/a+b/c&d/e=f",
    ];
    for sample in samples {
        let normalised = normalise_path(sample);
        let round_trip = normalise_path(&encode_path(&decode_path(&normalised)));
        assert_eq!(
            normalise_path(&decode_path(&round_trip)),
            normalised,
            "unstable for {:?}",
            sample
        );
    }
}

#[test]
fn test_encode_keeps_separators() {
    assert_eq!(encode_path("/a b/c?d"), "/a%20b/c%3Fd");
    assert_eq!(decode_path("/a%20b/c%3Fd"), "/a b/c?d");
}

#[test]
fn test_join_skips_bare_separator() {
    let base = "https://dav.example.com/root/";
    assert_eq!(
        join_url(base, &["a/", "/", "b"]).unwrap(),
        join_url(base, &["a/", "b"]).unwrap()
    );
    assert_eq!(join_url(base, &["a/", "b"]).unwrap(), "https://dav.example.com/root/a/b");
}

#[test]
fn test_relative_to_root_is_absolute() {
    assert_eq!(relative_to("/", "/a%20b/c"), "/a b/c");
    assert_eq!(relative_to("/dav", "/dav/files/x.txt"), "/files/x.txt");
}

#[test]
fn test_all_ancestors_shallow_first() {
    assert_eq!(all_ancestors("/x/y/z/"), vec!["/x", "/x/y", "/x/y/z"]);
    assert!(all_ancestors("/").is_empty());
}
