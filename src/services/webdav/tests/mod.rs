
use crate::services::webdav::{AuthType, WebDAVConfig, WebDAVService};

/// Service pointed at a mock server with basic credentials
pub(crate) fn create_test_service(server_url: &str) -> WebDAVService {
    let config = WebDAVConfig::new(server_url).with_basic_auth("testuser", "testpass");
    WebDAVService::new(config).expect("Failed to create test service")
}

pub(crate) const CHALLENGE: &str =
    r#"Digest realm="files@example.com", qop="auth", nonce="7ypf/xlj9XXwfDPEoM4URrv/xwf94BcCAzFZH4GiTo0v", opaque="FQhe/qaU925kfnzjCev0ciny7QMkPqMAFRtzCUYo5tdS", algorithm=MD5"#;

pub(crate) fn digest_service(server_url: &str, auth_type: AuthType) -> WebDAVService {
    let config = WebDAVConfig::new(server_url)
        .with_basic_auth("Mufasa", "Circle of Life")
        .with_auth_type(auth_type);
    WebDAVService::new(config).expect("Failed to create digest service")
}

pub(crate) fn multistatus(responses: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<d:multistatus xmlns:d="DAV:">{}</d:multistatus>"#,
        responses
    )
}

pub(crate) fn file_response(href: &str, size: u64, content_type: &str) -> String {
    format!(
        r#"<d:response>
    <d:href>{}</d:href>
    <d:propstat>
        <d:prop>
            <d:getlastmodified>Tue, 29 Jul 2025 01:34:17 GMT</d:getlastmodified>
            <d:getcontentlength>{}</d:getcontentlength>
            <d:getcontenttype>{}</d:getcontenttype>
            <d:getetag>"etag-{}"</d:getetag>
            <d:resourcetype/>
        </d:prop>
        <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
</d:response>"#,
        href, size, content_type, size
    )
}

pub(crate) fn collection_response(href: &str) -> String {
    format!(
        r#"<d:response>
    <d:href>{}</d:href>
    <d:propstat>
        <d:prop>
            <d:getlastmodified>Fri, 20 Jun 2025 23:35:17 GMT</d:getlastmodified>
            <d:resourcetype><d:collection/></d:resourcetype>
        </d:prop>
        <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
</d:response>"#,
        href
    )
}
