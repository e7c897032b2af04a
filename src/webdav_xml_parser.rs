use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde_json::{Map, Value};
use std::str;
use std::sync::Arc;

use crate::errors::{Result, WebDAVError};
use crate::models::dav::parse_status_line;
use crate::models::{
    DAVPropstat, DAVProps, DAVResponse, DAVResult, DiskQuota, DiskQuotaAvailable, FileKind,
    FileStat, SearchResult,
};
use crate::services::webdav::url_management::{
    basename, decode_path, encode_path, make_path_absolute, normalise_path, WebDAVUrlManager,
};

/// Value hook for element text: `(jpath, value) -> replacement`.
/// `jpath` is the dot-joined chain of local names, e.g.
/// `multistatus.response.propstat.prop.getetag`.
pub type TagParser = Arc<dyn Fn(&str, &str) -> Option<String> + Send + Sync>;

/// Value hook for attributes, called with `<element jpath>.<prefix><name>`
pub type AttributeParser = Arc<dyn Fn(&str, &str) -> Option<String> + Send + Sync>;

const DISPLAYNAME_JPATH_SUFFIX: &str = "propstat.prop.displayname";

#[derive(Clone)]
pub struct ParsingConfig {
    pub attribute_name_prefix: String,
    pub attribute_parsers: Vec<AttributeParser>,
    pub tag_parsers: Vec<TagParser>,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            attribute_name_prefix: "@".to_string(),
            attribute_parsers: Vec::new(),
            tag_parsers: Vec::new(),
        }
    }
}

impl std::fmt::Debug for ParsingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsingConfig")
            .field("attribute_name_prefix", &self.attribute_name_prefix)
            .field("attribute_parsers", &self.attribute_parsers.len())
            .field("tag_parsers", &self.tag_parsers.len())
            .finish()
    }
}

impl ParsingConfig {
    fn process_tag(&self, jpath: &str, value: String) -> String {
        // displayname stays verbatim, "2024.10" is a name and not a number
        if jpath.ends_with(DISPLAYNAME_JPATH_SUFFIX) {
            return value;
        }
        first_change(&self.tag_parsers, jpath, value)
    }

    fn process_attribute(&self, jpath: &str, value: String) -> String {
        first_change(&self.attribute_parsers, jpath, value)
    }
}

fn first_change(
    parsers: &[Arc<dyn Fn(&str, &str) -> Option<String> + Send + Sync>],
    jpath: &str,
    value: String,
) -> String {
    for parser in parsers {
        if let Some(changed) = parser(jpath, &value) {
            if changed != value {
                return changed;
            }
        }
    }
    value
}

#[derive(Debug, Default)]
struct XmlNode {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<XmlNode>,
}

impl XmlNode {
    fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn text_of(&self, name: &str) -> Option<String> {
        self.child(name).map(|c| c.text.clone().unwrap_or_default())
    }

    fn to_value(&self, prefix: &str) -> Value {
        if self.children.is_empty() && self.attributes.is_empty() {
            return Value::String(self.text.clone().unwrap_or_default());
        }
        let mut map = Map::new();
        for (key, value) in &self.attributes {
            map.insert(format!("{}{}", prefix, key), Value::String(value.clone()));
        }
        if let Some(ref text) = self.text {
            map.insert("text".to_string(), Value::String(text.clone()));
        }
        for child in &self.children {
            insert_repeated(&mut map, &child.name, child.to_value(prefix));
        }
        Value::Object(map)
    }
}

fn insert_repeated(map: &mut Map<String, Value>, key: &str, value: Value) {
    match map.get_mut(key) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(key.to_string(), value);
        }
    }
}

fn get_local_name(e: &BytesStart) -> Result<String> {
    let qname = e.name();
    let local = qname.local_name();
    let name = str::from_utf8(local.as_ref())
        .map_err(|e| WebDAVError::xml(format!("Invalid UTF-8 in element name: {}", e)))?;
    Ok(name.to_string())
}

fn read_attributes(e: &BytesStart, jpath: &str, config: &ParsingConfig) -> Result<Vec<(String, String)>> {
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(WebDAVError::xml)?;
        if attr.key.as_ref().starts_with(b"xmlns") {
            continue;
        }
        let name = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value().map_err(WebDAVError::xml)?.into_owned();
        let attr_path = format!("{}.{}{}", jpath, config.attribute_name_prefix, name);
        attributes.push((name, config.process_attribute(&attr_path, value)));
    }
    Ok(attributes)
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if root.is_none() {
                *root = Some(node);
            }
        }
    }
}

fn jpath_of(stack: &[XmlNode], name: &str) -> String {
    let mut parts: Vec<&str> = stack.iter().map(|n| n.name.as_str()).collect();
    parts.push(name);
    parts.join(".")
}

/// Builds a namespace-free element tree, running the value hooks
fn build_tree(xml: &str, config: &ParsingConfig) -> Result<Option<XmlNode>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = get_local_name(&e)?;
                let jpath = jpath_of(&stack, &name);
                let attributes = read_attributes(&e, &jpath, config)?;
                stack.push(XmlNode { name, attributes, ..Default::default() });
            }
            Ok(Event::Empty(e)) => {
                let name = get_local_name(&e)?;
                let jpath = jpath_of(&stack, &name);
                let attributes = read_attributes(&e, &jpath, config)?;
                attach(&mut stack, &mut root, XmlNode { name, attributes, ..Default::default() });
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(WebDAVError::xml)?;
                if let Some(node) = stack.last_mut() {
                    node.text.get_or_insert_with(String::new).push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                if let Some(node) = stack.last_mut() {
                    node.text.get_or_insert_with(String::new).push_str(&text);
                }
            }
            Ok(Event::End(_)) => {
                if let Some(mut node) = stack.pop() {
                    if let Some(text) = node.text.take() {
                        let jpath = jpath_of(&stack, &node.name);
                        node.text = Some(config.process_tag(&jpath, text));
                    }
                    attach(&mut stack, &mut root, node);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(WebDAVError::xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(root)
}

/// Parses a multistatus body into the normalised tree
pub fn parse_xml(xml: &str, config: &ParsingConfig) -> Result<DAVResult> {
    let root = build_tree(xml, config)?
        .filter(|node| node.name == "multistatus")
        .ok_or_else(|| WebDAVError::invalid_response("No root multistatus found"))?;

    let responses = root
        .children_named("response")
        .map(|response| normalise_response(response, &config.attribute_name_prefix))
        .collect();

    Ok(DAVResult { responses })
}

fn normalise_response(node: &XmlNode, prefix: &str) -> DAVResponse {
    let href = node.text_of("href").unwrap_or_default();
    let status = node.text_of("status");

    let propstats: Vec<&XmlNode> = node.children_named("propstat").collect();
    // Prefer the successful propstat, servers list missing props as a second 404 block
    let chosen = propstats
        .iter()
        .find(|p| {
            p.text_of("status")
                .and_then(|s| parse_status_line(&s))
                .map(|(code, _)| (200..300).contains(&code))
                .unwrap_or(false)
        })
        .or_else(|| propstats.first());

    let propstat = match (&status, chosen) {
        (Some(_), _) | (None, None) => None,
        (None, Some(p)) => Some(DAVPropstat {
            prop: p.child("prop").map(|prop| props_from_node(prop, prefix)).unwrap_or_default(),
            status: p.text_of("status").unwrap_or_default(),
        }),
    };

    DAVResponse { href, status, propstat }
}

fn props_from_node(node: &XmlNode, prefix: &str) -> DAVProps {
    let mut props = DAVProps::default();
    for child in &node.children {
        let text = child.text.clone();
        match child.name.as_str() {
            "displayname" => props.displayname = Some(text.unwrap_or_default()),
            "getlastmodified" => props.getlastmodified = text,
            "getcontentlength" => props.getcontentlength = text,
            "getcontenttype" => props.getcontenttype = text,
            "getetag" => props.getetag = text,
            "resourcetype" => {
                props.has_resourcetype = true;
                props.is_collection = child.child("collection").is_some();
            }
            "quota-used-bytes" => props.quota_used_bytes = text,
            "quota-available-bytes" => props.quota_available_bytes = text,
            _ => {}
        }
        insert_repeated(&mut props.raw, &child.name, child.to_value(prefix));
    }
    props
}

/// Maps DAV properties onto a `FileStat`
pub fn prepare_file_from_props(props: &DAVProps, filename: &str, is_detailed: bool) -> FileStat {
    let kind = if props.is_collection {
        FileKind::Directory
    } else {
        FileKind::File
    };
    let size = props
        .getcontentlength
        .as_deref()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0);
    let mime = match kind {
        FileKind::File => Some(
            props
                .getcontenttype
                .as_deref()
                .map(|m| m.split(';').next().unwrap_or("").to_string())
                .unwrap_or_default(),
        ),
        FileKind::Directory => None,
    };

    FileStat {
        filename: filename.to_string(),
        basename: basename(filename).to_string(),
        lastmod: props.getlastmodified.clone(),
        size,
        kind,
        etag: props.getetag.as_ref().map(|e| e.replace('"', "")),
        mime,
        props: is_detailed.then(|| props.raw.clone()),
    }
}

/// Single-resource PROPFIND result
pub fn parse_stat(result: &DAVResult, filename: &str, is_detailed: bool) -> Result<FileStat> {
    let propstat = result
        .responses
        .first()
        .and_then(|r| r.propstat.as_ref())
        .ok_or_else(|| WebDAVError::invalid_response("Failed getting item stat: bad response"))?;

    if let Some((code, text)) = parse_status_line(&propstat.status) {
        if code >= 400 {
            return Err(WebDAVError::from_status_line(code, &text));
        }
    }

    Ok(prepare_file_from_props(&propstat.prop, &normalise_path(filename), is_detailed))
}

/// Listing of a collection. The entry for the collection itself is dropped
/// unless `include_self` is set; server order is kept.
pub fn get_directory_files(
    result: &DAVResult,
    urls: &WebDAVUrlManager,
    request_path: &str,
    is_detailed: bool,
    include_self: bool,
) -> Vec<FileStat> {
    let request_path = normalise_path(&make_path_absolute(request_path));

    let nodes = result.responses.iter().filter_map(|item| {
        let propstat = item.propstat.as_ref()?;
        let filename = urls.href_to_relative_path(&item.href);
        Some(prepare_file_from_props(&propstat.prop, &filename, is_detailed))
    });

    if include_self {
        return nodes.collect();
    }

    nodes
        .filter(|item| {
            !item.basename.is_empty()
                && (item.kind == FileKind::File || item.filename != request_path)
        })
        .collect()
}

/// Maps quota sentinels: -3 is unlimited, -2 and -1 are unknown
pub fn translate_disk_space(value: &str) -> Result<DiskQuotaAvailable> {
    let parsed: i64 = value
        .trim()
        .parse()
        .map_err(|_| WebDAVError::invalid_response(format!("Invalid quota value: {}", value)))?;
    Ok(match parsed {
        -3 => DiskQuotaAvailable::UNLIMITED,
        n if n < 0 => DiskQuotaAvailable::UNKNOWN,
        n => DiskQuotaAvailable::Bytes(n as u64),
    })
}

/// `None` when the document carries no quota properties
pub fn parse_quota(result: &DAVResult) -> Result<Option<DiskQuota>> {
    let props = match result.responses.first().and_then(|r| r.propstat.as_ref()) {
        Some(propstat) => &propstat.prop,
        None => return Ok(None),
    };
    let (used, available) = match (&props.quota_used_bytes, &props.quota_available_bytes) {
        (Some(used), Some(available)) => (used, available),
        _ => return Ok(None),
    };
    let used = used
        .trim()
        .parse()
        .map_err(|_| WebDAVError::invalid_response(format!("Invalid quota value: {}", used)))?;
    Ok(Some(DiskQuota {
        used,
        available: translate_disk_space(available)?,
    }))
}

pub fn parse_search(result: &DAVResult, search_arbiter: &str, is_detailed: bool) -> SearchResult {
    let encoded_root = encode_path(search_arbiter);
    let encoded_root = encoded_root.trim_end_matches('/');

    let truncated = result.responses.iter().any(|response| {
        let insufficient = response
            .effective_status()
            .and_then(parse_status_line)
            .map(|(code, _)| code == 507)
            .unwrap_or(false);
        insufficient && response.href.trim_end_matches('/').ends_with(encoded_root)
    });

    let results = result
        .responses
        .iter()
        .filter_map(|response| {
            let propstat = response.propstat.as_ref()?;
            let filename = response
                .href
                .split('/')
                .map(decode_path)
                .collect::<Vec<_>>()
                .join("/");
            Some(prepare_file_from_props(&propstat.prop, &filename, is_detailed))
        })
        .collect();

    SearchResult { truncated, results }
}

/// Extracts `(token, timeout)` from a LOCK answer
pub fn parse_lock_response(xml: &str) -> Result<(Option<String>, Option<String>)> {
    let root = match build_tree(xml, &ParsingConfig::default())? {
        Some(root) if root.name == "prop" => root,
        _ => return Ok((None, None)),
    };
    let activelock = root
        .child("lockdiscovery")
        .and_then(|d| d.child("activelock"));
    let token = activelock
        .and_then(|a| a.child("locktoken"))
        .and_then(|t| t.text_of("href"))
        .filter(|t| !t.is_empty());
    let timeout = activelock.and_then(|a| a.text_of("timeout"));
    Ok((token, timeout))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> DAVResult {
        parse_xml(xml, &ParsingConfig::default()).unwrap()
    }

    #[test]
    fn test_parse_simple_propfind() {
        let xml = r#"<?xml version="1.0"?>
        <d:multistatus xmlns:d="DAV:">
            <d:response>
                <d:href>/webdav/test.pdf</d:href>
                <d:propstat>
                    <d:prop>
                        <d:displayname>test.pdf</d:displayname>
                        <d:getcontentlength>1024</d:getcontentlength>
                        <d:getlastmodified>Mon, 01 Jan 2024 12:00:00 GMT</d:getlastmodified>
                        <d:getcontenttype>application/pdf; charset=binary</d:getcontenttype>
                        <d:getetag>"abc123"</d:getetag>
                        <d:resourcetype/>
                    </d:prop>
                    <d:status>HTTP/1.1 200 OK</d:status>
                </d:propstat>
            </d:response>
        </d:multistatus>"#;

        let result = parse(xml);
        let stat = parse_stat(&result, "/webdav/test.pdf", false).unwrap();
        assert_eq!(stat.basename, "test.pdf");
        assert_eq!(stat.size, 1024);
        assert_eq!(stat.mime.as_deref(), Some("application/pdf"));
        assert_eq!(stat.etag.as_deref(), Some("abc123"));
        assert_eq!(stat.lastmod.as_deref(), Some("Mon, 01 Jan 2024 12:00:00 GMT"));
        assert_eq!(stat.kind, FileKind::File);
        assert!(stat.props.is_none());
    }

    #[test]
    fn test_stat_of_collection_has_no_mime() {
        let xml = r#"<?xml version="1.0"?>
        <d:multistatus xmlns:d="DAV:">
            <d:response>
                <d:href>/dav/content/</d:href>
                <d:propstat>
                    <d:prop>
                        <d:resourcetype><d:collection/></d:resourcetype>
                        <d:getcontenttype>httpd/unix-directory</d:getcontenttype>
                    </d:prop>
                    <d:status>HTTP/1.1 200 OK</d:status>
                </d:propstat>
            </d:response>
        </d:multistatus>"#;

        let stat = parse_stat(&parse(xml), "/dav/content/", false).unwrap();
        assert_eq!(stat.kind, FileKind::Directory);
        assert_eq!(stat.filename, "/dav/content");
        assert_eq!(stat.mime, None);
        assert_eq!(stat.size, 0);
    }

    #[test]
    fn test_stat_error_status_line() {
        let xml = r#"<d:multistatus xmlns:d="DAV:">
            <d:response>
                <d:href>/missing</d:href>
                <d:propstat>
                    <d:prop/>
                    <d:status>HTTP/1.1 404 Not Found</d:status>
                </d:propstat>
            </d:response>
        </d:multistatus>"#;

        let err = parse_stat(&parse(xml), "/missing", false).unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_stat_without_propstat_is_bad_response() {
        let xml = r#"<d:multistatus xmlns:d="DAV:">
            <d:response><d:href>/x</d:href><d:status>HTTP/1.1 200 OK</d:status></d:response>
        </d:multistatus>"#;
        assert!(matches!(
            parse_stat(&parse(xml), "/x", false),
            Err(WebDAVError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_repeated_propstat_prefers_success() {
        let xml = r#"<d:multistatus xmlns:d="DAV:">
            <d:response>
                <d:href>/a.txt</d:href>
                <d:propstat>
                    <d:prop><d:quota-used-bytes/></d:prop>
                    <d:status>HTTP/1.1 404 Not Found</d:status>
                </d:propstat>
                <d:propstat>
                    <d:prop><d:getcontentlength>7</d:getcontentlength></d:prop>
                    <d:status>HTTP/1.1 200 OK</d:status>
                </d:propstat>
            </d:response>
        </d:multistatus>"#;

        let result = parse(xml);
        let propstat = result.responses[0].propstat.as_ref().unwrap();
        assert_eq!(propstat.status, "HTTP/1.1 200 OK");
        assert_eq!(propstat.prop.getcontentlength.as_deref(), Some("7"));
    }

    #[test]
    fn test_missing_multistatus_root() {
        let err = parse_xml("<d:prop xmlns:d=\"DAV:\"/>", &ParsingConfig::default()).unwrap_err();
        assert!(matches!(err, WebDAVError::InvalidResponse(_)));
    }

    #[test]
    fn test_empty_multistatus() {
        let result = parse(r#"<d:multistatus xmlns:d="DAV:"/>"#);
        assert!(result.responses.is_empty());
    }

    #[test]
    fn test_displayname_not_transformed() {
        let mut config = ParsingConfig::default();
        config.tag_parsers.push(Arc::new(|_path, value| Some(format!("x{}", value))));

        let xml = r#"<d:multistatus xmlns:d="DAV:">
            <d:response>
                <d:href>/2024.10</d:href>
                <d:propstat>
                    <d:prop>
                        <d:displayname>2024.10</d:displayname>
                        <d:getetag>etag</d:getetag>
                    </d:prop>
                    <d:status>HTTP/1.1 200 OK</d:status>
                </d:propstat>
            </d:response>
        </d:multistatus>"#;

        let result = parse_xml(xml, &config).unwrap();
        let props = &result.responses[0].propstat.as_ref().unwrap().prop;
        assert_eq!(props.displayname.as_deref(), Some("2024.10"));
        assert_eq!(props.getetag.as_deref(), Some("xetag"));
    }

    #[test]
    fn test_first_changing_parser_wins() {
        let mut config = ParsingConfig::default();
        config.tag_parsers.push(Arc::new(|_path, value| Some(value.to_string())));
        config.tag_parsers.push(Arc::new(|path, value| {
            path.ends_with("getcontentlength").then(|| format!("{}0", value))
        }));
        config.tag_parsers.push(Arc::new(|_path, _value| Some("never".to_string())));

        let xml = r#"<d:multistatus xmlns:d="DAV:"><d:response><d:href>/a</d:href>
            <d:propstat><d:prop><d:getcontentlength>5</d:getcontentlength></d:prop>
            <d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response></d:multistatus>"#;

        let result = parse_xml(xml, &config).unwrap();
        let props = &result.responses[0].propstat.as_ref().unwrap().prop;
        assert_eq!(props.getcontentlength.as_deref(), Some("50"));
    }

    #[test]
    fn test_detailed_props_use_attribute_prefix() {
        let mut config = ParsingConfig::default();
        config.attribute_name_prefix = "$".to_string();
        let xml = r#"<d:multistatus xmlns:d="DAV:" xmlns:x="urn:x"><d:response><d:href>/a</d:href>
            <d:propstat><d:prop>
                <x:tag kind="blue">label</x:tag>
                <d:resourcetype/>
            </d:prop><d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response></d:multistatus>"#;

        let result = parse_xml(xml, &config).unwrap();
        let props = &result.responses[0].propstat.as_ref().unwrap().prop;
        let stat = prepare_file_from_props(props, "/a", true);
        let raw = stat.props.unwrap();
        assert_eq!(raw["tag"]["$kind"], "blue");
        assert_eq!(raw["tag"]["text"], "label");
        assert_eq!(raw["resourcetype"], "");
    }

    #[test]
    fn test_directory_listing_excludes_self() {
        let xml = r#"<d:multistatus xmlns:d="DAV:">
            <d:response><d:href>/a/</d:href><d:propstat><d:prop><d:resourcetype><d:collection/></d:resourcetype></d:prop><d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response>
            <d:response><d:href>/a/b</d:href><d:propstat><d:prop><d:resourcetype/></d:prop><d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response>
            <d:response><d:href>/a/c/</d:href><d:propstat><d:prop><d:resourcetype><d:collection/></d:resourcetype></d:prop><d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response>
        </d:multistatus>"#;
        let result = parse(xml);

        let urls = WebDAVUrlManager::new("https://store.example.com/", None).unwrap();
        let files = get_directory_files(&result, &urls, "/a/", false, false);
        let names: Vec<&str> = files.iter().map(|f| f.basename.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);

        let files = get_directory_files(&result, &urls, "/a/", false, true);
        let names: Vec<&str> = files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["/a", "/a/b", "/a/c"]);
    }

    #[test]
    fn test_directory_listing_relative_to_base_path() {
        let xml = r#"<d:multistatus xmlns:d="DAV:">
            <d:response><d:href>https://store.example.com/dav/content/</d:href><d:propstat><d:prop><d:resourcetype><d:collection/></d:resourcetype></d:prop><d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response>
            <d:response><d:href>/dav/content/my%20logo.png</d:href><d:propstat><d:prop><d:getcontenttype>image/png</d:getcontenttype><d:resourcetype/></d:prop><d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response>
        </d:multistatus>"#;

        let urls = WebDAVUrlManager::new("https://store.example.com/dav", None).unwrap();
        let files = get_directory_files(&parse(xml), &urls, "/content", false, false);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "/content/my logo.png");
        assert_eq!(files[0].mime.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_translate_disk_space() {
        assert_eq!(translate_disk_space("-3").unwrap(), DiskQuotaAvailable::UNLIMITED);
        assert_eq!(translate_disk_space("-2").unwrap(), DiskQuotaAvailable::UNKNOWN);
        assert_eq!(translate_disk_space("-1").unwrap(), DiskQuotaAvailable::UNKNOWN);
        assert_eq!(translate_disk_space("12345").unwrap(), DiskQuotaAvailable::Bytes(12345));
        assert!(translate_disk_space("lots").is_err());
    }

    #[test]
    fn test_parse_quota() {
        let xml = r#"<d:multistatus xmlns:d="DAV:"><d:response><d:href>/</d:href>
            <d:propstat><d:prop>
                <d:quota-used-bytes>4096</d:quota-used-bytes>
                <d:quota-available-bytes>-3</d:quota-available-bytes>
            </d:prop><d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response></d:multistatus>"#;
        let quota = parse_quota(&parse(xml)).unwrap().unwrap();
        assert_eq!(quota.used, 4096);
        assert_eq!(quota.available, DiskQuotaAvailable::UNLIMITED);
    }

    #[test]
    fn test_parse_quota_absent_is_none() {
        let xml = r#"<d:multistatus xmlns:d="DAV:"><d:response><d:href>/</d:href>
            <d:propstat><d:prop><d:getetag>"x"</d:getetag></d:prop>
            <d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response></d:multistatus>"#;
        assert_eq!(parse_quota(&parse(xml)).unwrap(), None);
    }

    #[test]
    fn test_parse_search_truncated() {
        let xml = r#"<d:multistatus xmlns:d="DAV:">
            <d:response><d:href>/dav/my%20docs/a.txt</d:href><d:propstat><d:prop><d:getcontentlength>3</d:getcontentlength></d:prop><d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response>
            <d:response><d:href>/dav/my%20docs/</d:href><d:status>HTTP/1.1 507 Insufficient Storage</d:status></d:response>
        </d:multistatus>"#;
        let result = parse_search(&parse(xml), "/dav/my docs/", false);
        assert!(result.truncated);
        assert_eq!(result.results.len(), 1);
        assert_eq!(result.results[0].filename, "/dav/my docs/a.txt");

        let result = parse_search(&parse(xml), "/elsewhere", false);
        assert!(!result.truncated);
    }

    #[test]
    fn test_parse_lock_response() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
        <D:prop xmlns:D="DAV:">
            <D:lockdiscovery>
                <D:activelock>
                    <D:locktype><D:write/></D:locktype>
                    <D:lockscope><D:exclusive/></D:lockscope>
                    <D:timeout>Second-3600</D:timeout>
                    <D:locktoken><D:href>opaquelocktoken:e71d4fae-5dec</D:href></D:locktoken>
                </D:activelock>
            </D:lockdiscovery>
        </D:prop>"#;
        let (token, timeout) = parse_lock_response(xml).unwrap();
        assert_eq!(token.as_deref(), Some("opaquelocktoken:e71d4fae-5dec"));
        assert_eq!(timeout.as_deref(), Some("Second-3600"));
    }
}
