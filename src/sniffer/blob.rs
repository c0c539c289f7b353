use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::error::{ReadError, ReadResult};
use crate::resource::Resource;

/// Number of leading bytes read for magic number checks.
pub const PREFIX_LENGTH: u64 = 1024;

/// Resources up to this size may be read whole to be parsed.
pub const CONTENT_CEILING: u64 = 5_000_000;

/// Root element of an XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlRoot {
    pub local_name: String,
    pub namespace: Option<String>,
}

/// Lazy, memoized views over the bytes of a [`Resource`], shared by sniffers.
///
/// Every view is computed at most once, whichever sniffer asks first.
/// Content that cannot be decoded as requested yields `None`; only a failure
/// to read the bytes is an error.
pub struct FormatSnifferBlob {
    resource: Arc<dyn Resource>,
    prefix: OnceCell<Vec<u8>>,
    content: OnceCell<Option<Vec<u8>>>,
    text: OnceCell<Option<String>>,
    json: OnceCell<Option<serde_json::Value>>,
    xml: OnceCell<Option<XmlRoot>>,
}

impl FormatSnifferBlob {
    pub fn new(resource: Arc<dyn Resource>) -> Self {
        Self {
            resource,
            prefix: OnceCell::new(),
            content: OnceCell::new(),
            text: OnceCell::new(),
            json: OnceCell::new(),
            xml: OnceCell::new(),
        }
    }

    pub fn resource(&self) -> &Arc<dyn Resource> {
        &self.resource
    }

    /// Up to [`PREFIX_LENGTH`] leading bytes.
    pub async fn prefix(&self) -> ReadResult<&[u8]> {
        let prefix = self
            .prefix
            .get_or_try_init(|| async {
                if let Some(Some(content)) = self.content.get() {
                    let len = content.len().min(PREFIX_LENGTH as usize);
                    return Ok(content[..len].to_vec());
                }
                self.resource.read(Some(0..PREFIX_LENGTH)).await
            })
            .await?;
        Ok(prefix)
    }

    /// The first non-whitespace byte, skipping a UTF-8 byte order mark.
    pub async fn first_significant_byte(&self) -> ReadResult<Option<u8>> {
        let prefix = self.prefix().await?;
        let prefix = prefix.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(prefix);
        Ok(prefix.iter().copied().find(|b| !b.is_ascii_whitespace()))
    }

    /// The whole content, when it is no larger than [`CONTENT_CEILING`].
    pub async fn content(&self) -> ReadResult<Option<&[u8]>> {
        let content = self
            .content
            .get_or_try_init(|| async {
                let known_length = self.resource.estimated_length().await.ok().flatten();
                if known_length.is_some_and(|length| length > CONTENT_CEILING) {
                    return Ok::<_, ReadError>(None);
                }

                // Length unknown: read one byte past the ceiling to detect overflow
                let data = self.resource.read(Some(0..CONTENT_CEILING + 1)).await?;
                Ok((data.len() as u64 <= CONTENT_CEILING).then_some(data))
            })
            .await?;
        Ok(content.as_deref())
    }

    /// The content decoded as UTF-8, without its byte order mark.
    pub async fn text(&self) -> ReadResult<Option<&str>> {
        let text = self
            .text
            .get_or_try_init(|| async {
                let text = self.content().await?.and_then(|content| {
                    let content = content.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(content);
                    std::str::from_utf8(content).ok().map(str::to_string)
                });
                Ok::<_, crate::error::ReadError>(text)
            })
            .await?;
        Ok(text.as_deref())
    }

    /// The content parsed as JSON.
    pub async fn json(&self) -> ReadResult<Option<&serde_json::Value>> {
        let json = self
            .json
            .get_or_try_init(|| async {
                let text = self.text().await?;
                Ok::<_, crate::error::ReadError>(
                    text.and_then(|text| serde_json::from_str(text).ok()),
                )
            })
            .await?;
        Ok(json.as_ref())
    }

    /// The root element of the content parsed as XML.
    pub async fn xml_root(&self) -> ReadResult<Option<&XmlRoot>> {
        let root = self
            .xml
            .get_or_try_init(|| async {
                let text = self.text().await?;
                Ok::<_, crate::error::ReadError>(text.and_then(parse_xml_root))
            })
            .await?;
        Ok(root.as_ref())
    }
}

fn parse_xml_root(text: &str) -> Option<XmlRoot> {
    let mut reader = Reader::from_str(text);
    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) | Ok(Event::Empty(element)) => {
                return Some(xml_root(&element));
            }
            Ok(Event::Eof) | Err(_) => return None,
            // Text before the root means this is not XML at all
            Ok(Event::Text(text)) if !text.iter().all(u8::is_ascii_whitespace) => return None,
            Ok(_) => {}
        }
    }
}

fn xml_root(element: &BytesStart<'_>) -> XmlRoot {
    let name = element.name();
    let local_name = String::from_utf8_lossy(name.local_name().as_ref()).into_owned();
    let xmlns_key = match name.prefix() {
        Some(prefix) => format!("xmlns:{}", String::from_utf8_lossy(prefix.as_ref())),
        None => "xmlns".to_string(),
    };

    let namespace = element
        .attributes()
        .map_while(Result::ok)
        .find(|attribute| attribute.key.as_ref() == xmlns_key.as_bytes())
        .map(|attribute| String::from_utf8_lossy(&attribute.value).into_owned());

    XmlRoot {
        local_name,
        namespace,
    }
}
