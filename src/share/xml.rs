//! Listing response decoding over `aws-smithy-xml`
//!
//! A listing page is `<EnumerationResults>` holding `<Entries>` (a run of
//! `<File>`/`<Directory>` nodes) and an optional `<NextMarker>`. Everything
//! else in the document is skipped.

use crate::error::{AzfilesError, Result};
use aws_smithy_xml::decode::{try_data, Document, ScopedDecoder, XmlDecodeError};

const ROOT_ELEMENT: &str = "EnumerationResults";

/// One child of `<Entries>`, not yet interpreted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingNode {
    /// Element name, `File` or `Directory` for known entries
    pub tag: String,
    pub name: Option<String>,
    /// `<Properties>` children in document order
    pub properties: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub nodes: Vec<ListingNode>,
    pub next_marker: Option<String>,
}

fn decode_error(err: XmlDecodeError) -> AzfilesError {
    AzfilesError::xml(err.to_string())
}

/// Decode one page of a directory listing
pub fn decode_listing(body: &str) -> Result<ListingPage> {
    let mut doc = Document::new(body.trim_start_matches('\u{feff}'));
    let mut root = doc.root_element().map_err(decode_error)?;
    if !root.start_el().matches(ROOT_ELEMENT) {
        return Err(AzfilesError::xml(format!(
            "expected <{ROOT_ELEMENT}>, found <{}>",
            root.start_el().local()
        )));
    }

    let mut page = ListingPage::default();
    while let Some(mut tag) = root.next_tag() {
        if tag.start_el().matches("Entries") {
            while let Some(mut node) = tag.next_tag() {
                page.nodes.push(decode_node(&mut node)?);
            }
        } else if tag.start_el().matches("NextMarker") {
            let marker = try_data(&mut tag).map_err(decode_error)?;
            let marker = marker.trim();
            if !marker.is_empty() {
                page.next_marker = Some(marker.to_string());
            }
        }
    }
    Ok(page)
}

fn decode_node(node: &mut ScopedDecoder<'_, '_>) -> Result<ListingNode> {
    let mut decoded = ListingNode {
        tag: node.start_el().local().to_string(),
        ..ListingNode::default()
    };

    while let Some(mut child) = node.next_tag() {
        if child.start_el().matches("Name") {
            decoded.name = Some(try_data(&mut child).map_err(decode_error)?.into_owned());
        } else if child.start_el().matches("Properties") {
            while let Some(mut property) = child.next_tag() {
                let key = property.start_el().local().to_string();
                let value = try_data(&mut property).map_err(decode_error)?;
                decoded.properties.push((key, value.into_owned()));
            }
        }
    }
    Ok(decoded)
}
