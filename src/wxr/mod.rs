//! WXR (WordPress eXtended RSS) export parsing.
//!
//! `WxrDocument::parse` walks the export once with the quick-xml event
//! reader and keeps only what the SQL generator needs: channel-level term
//! declarations, post/page items in publish or draft state, and their
//! non-spam comments.

pub mod sql;

use anyhow::{bail, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::Reader;

/// A term declared at channel level (`wp:category` or `wp:tag`).
#[derive(Debug, Clone, Default)]
pub struct WxrTerm {
    pub name: String,
    pub slug: String,
    /// Parent slug; empty for top-level categories and for tags.
    pub parent_slug: String,
}

/// One comment attached to an item. Spam never reaches this struct.
#[derive(Debug, Clone, Default)]
pub struct WxrComment {
    pub id: i64,
    pub author: String,
    pub email: String,
    pub url: String,
    pub ip: String,
    pub date: String,
    pub content: String,
    pub approved: bool,
    pub parent: i64,
}

/// One post or page item in publish or draft state.
#[derive(Debug, Clone, Default)]
pub struct WxrItem {
    pub title: String,
    pub slug: String,
    pub post_id: i64,
    pub post_type: String,
    pub status: String,
    pub creator: String,
    pub date: String,
    pub content: String,
    pub excerpt: String,
    pub password: String,
    pub menu_order: i64,
    pub comment_status: String,
    pub ping_status: String,
    /// Slugs of categories and tags attached to this item.
    pub term_slugs: Vec<String>,
    pub comments: Vec<WxrComment>,
}

/// Parsed export, already filtered to the migratable subset.
#[derive(Debug, Default)]
pub struct WxrDocument {
    pub title: String,
    pub link: String,
    pub categories: Vec<WxrTerm>,
    pub tags: Vec<WxrTerm>,
    pub items: Vec<WxrItem>,
}

impl WxrDocument {
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut doc = Self::default();
        let mut in_channel_header = true;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"title" if in_channel_header => {
                        doc.title = read_element_text(&mut reader, e.name())?;
                    }
                    b"link" if in_channel_header => {
                        doc.link = read_element_text(&mut reader, e.name())?;
                    }
                    b"wp:category" => {
                        doc.categories.push(parse_channel_category(&mut reader)?);
                    }
                    b"wp:tag" => {
                        doc.tags.push(parse_channel_tag(&mut reader)?);
                    }
                    b"item" => {
                        in_channel_header = false;
                        if let Some(item) = parse_item(&mut reader)? {
                            doc.items.push(item);
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => bail!(
                    "WXR parse error at position {}: {e}",
                    reader.error_position()
                ),
            }
        }
        Ok(doc)
    }
}

/// Collect text and CDATA until the matching end tag.
fn read_element_text(reader: &mut Reader<&[u8]>, end: QName<'_>) -> Result<String> {
    let mut out = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(t) => out.push_str(&t.unescape()?),
            Event::CData(c) => out.push_str(&String::from_utf8_lossy(&c.into_inner())),
            Event::End(e) if e.name() == end => break,
            Event::Eof => bail!("unexpected end of document inside <{}>", show(end)),
            _ => {}
        }
    }
    Ok(out)
}

fn show(name: QName<'_>) -> String {
    String::from_utf8_lossy(name.as_ref()).into_owned()
}

fn parse_i64(s: &str) -> i64 {
    s.trim().parse().unwrap_or(0)
}

fn parse_channel_category(reader: &mut Reader<&[u8]>) -> Result<WxrTerm> {
    let mut term = WxrTerm::default();
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                match name.as_ref() {
                    b"wp:cat_name" => term.name = read_element_text(reader, name)?,
                    b"wp:category_nicename" => term.slug = read_element_text(reader, name)?,
                    b"wp:category_parent" => term.parent_slug = read_element_text(reader, name)?,
                    _ => reader.read_to_end(name).map(|_| ())?,
                }
            }
            Event::End(e) if e.name().as_ref() == b"wp:category" => break,
            Event::Eof => bail!("unexpected end of document inside <wp:category>"),
            _ => {}
        }
    }
    Ok(term)
}

fn parse_channel_tag(reader: &mut Reader<&[u8]>) -> Result<WxrTerm> {
    let mut term = WxrTerm::default();
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                match name.as_ref() {
                    b"wp:tag_name" => term.name = read_element_text(reader, name)?,
                    b"wp:tag_slug" => term.slug = read_element_text(reader, name)?,
                    _ => reader.read_to_end(name).map(|_| ())?,
                }
            }
            Event::End(e) if e.name().as_ref() == b"wp:tag" => break,
            Event::Eof => bail!("unexpected end of document inside <wp:tag>"),
            _ => {}
        }
    }
    Ok(term)
}

/// Parse one `<item>`; returns `None` for item kinds and states the
/// importer drops (attachments, revisions, trashed or private content).
fn parse_item(reader: &mut Reader<&[u8]>) -> Result<Option<WxrItem>> {
    let mut item = WxrItem::default();
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                match name.as_ref() {
                    b"title" => item.title = read_element_text(reader, name)?,
                    b"dc:creator" => item.creator = read_element_text(reader, name)?,
                    b"content:encoded" => item.content = read_element_text(reader, name)?,
                    b"excerpt:encoded" => item.excerpt = read_element_text(reader, name)?,
                    b"wp:post_id" => item.post_id = parse_i64(&read_element_text(reader, name)?),
                    b"wp:post_date" => item.date = read_element_text(reader, name)?,
                    b"wp:post_name" => item.slug = read_element_text(reader, name)?,
                    b"wp:post_type" => item.post_type = read_element_text(reader, name)?,
                    b"wp:status" => item.status = read_element_text(reader, name)?,
                    b"wp:post_password" => item.password = read_element_text(reader, name)?,
                    b"wp:menu_order" => {
                        item.menu_order = parse_i64(&read_element_text(reader, name)?)
                    }
                    b"wp:comment_status" => {
                        item.comment_status = read_element_text(reader, name)?
                    }
                    b"wp:ping_status" => item.ping_status = read_element_text(reader, name)?,
                    b"category" => {
                        if let Some(slug) = category_nicename(&e)? {
                            item.term_slugs.push(slug);
                        }
                        read_element_text(reader, QName(b"category"))?;
                    }
                    b"wp:comment" => {
                        if let Some(comment) = parse_comment(reader)? {
                            item.comments.push(comment);
                        }
                    }
                    _ => reader.read_to_end(name).map(|_| ())?,
                }
            }
            Event::End(e) if e.name().as_ref() == b"item" => break,
            Event::Eof => bail!("unexpected end of document inside <item>"),
            _ => {}
        }
    }

    let wanted_type = matches!(item.post_type.as_str(), "post" | "page");
    let wanted_status = matches!(item.status.as_str(), "publish" | "draft");
    Ok((wanted_type && wanted_status).then_some(item))
}

/// The `nicename` attribute of an item-level `<category>` element.
fn category_nicename(e: &BytesStart<'_>) -> Result<Option<String>> {
    match e.try_get_attribute("nicename")? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

/// Parse one `<wp:comment>`; spam and trashed comments are dropped.
fn parse_comment(reader: &mut Reader<&[u8]>) -> Result<Option<WxrComment>> {
    let mut comment = WxrComment::default();
    let mut approved_raw = String::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                match name.as_ref() {
                    b"wp:comment_id" => {
                        comment.id = parse_i64(&read_element_text(reader, name)?)
                    }
                    b"wp:comment_author" => comment.author = read_element_text(reader, name)?,
                    b"wp:comment_author_email" => {
                        comment.email = read_element_text(reader, name)?
                    }
                    b"wp:comment_author_url" => comment.url = read_element_text(reader, name)?,
                    b"wp:comment_author_IP" => comment.ip = read_element_text(reader, name)?,
                    b"wp:comment_date" => comment.date = read_element_text(reader, name)?,
                    b"wp:comment_content" => comment.content = read_element_text(reader, name)?,
                    b"wp:comment_approved" => {
                        approved_raw = read_element_text(reader, name)?
                    }
                    b"wp:comment_parent" => {
                        comment.parent = parse_i64(&read_element_text(reader, name)?)
                    }
                    _ => reader.read_to_end(name).map(|_| ())?,
                }
            }
            Event::End(e) if e.name().as_ref() == b"wp:comment" => break,
            Event::Eof => bail!("unexpected end of document inside <wp:comment>"),
            _ => {}
        }
    }

    if approved_raw == "spam" || approved_raw == "trash" {
        return Ok(None);
    }
    comment.approved = approved_raw == "1";
    Ok(Some(comment))
}
