//! Catalog snapshot: the items a node has published, plus the options of
//! the request that produced the snapshot.
//!
//! This is the one variant whose payload is a nested document. Layout:
//!
//! ```text
//! count:i32, PublishedItem * count, mode:i32, data_source_proc_ref:text
//! ```

use super::{MessageKind, Payload};
use crate::error::{Result, WireError};
use crate::proc_ref::ProcRef;
use crate::wire::{FieldReader, FieldWriter};

/// Smallest possible encoded [`PublishedItem`]: five empty texts and four bools.
const MIN_ITEM_LEN: usize = 5 * 4 + 4;

/// Summary of one published dataset version.
///
/// The four progress flags are independent of each other. Nothing at this
/// layer orders them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishedItem {
    pub proc_ref: String,
    pub name: String,
    pub description: String,
    pub imported: bool,
    pub published: bool,
    pub downloaded: bool,
    pub processed: bool,
    pub processing_progress: String,
    pub pipeline_definition: String,
}

impl PublishedItem {
    fn encode(&self, writer: &mut FieldWriter) {
        writer.put_text(&self.proc_ref);
        writer.put_text(&self.name);
        writer.put_text(&self.description);
        writer.put_bool(self.imported);
        writer.put_bool(self.published);
        writer.put_bool(self.downloaded);
        writer.put_bool(self.processed);
        writer.put_text(&self.processing_progress);
        writer.put_text(&self.pipeline_definition);
    }

    fn decode(reader: &mut FieldReader) -> Result<Self> {
        Ok(Self {
            proc_ref: reader.read_text("PublishedItem.proc_ref")?,
            name: reader.read_text("PublishedItem.name")?,
            description: reader.read_text("PublishedItem.description")?,
            imported: reader.read_bool("PublishedItem.imported")?,
            published: reader.read_bool("PublishedItem.published")?,
            downloaded: reader.read_bool("PublishedItem.downloaded")?,
            processed: reader.read_bool("PublishedItem.processed")?,
            processing_progress: reader.read_text("PublishedItem.processing_progress")?,
            pipeline_definition: reader.read_text("PublishedItem.pipeline_definition")?,
        })
    }
}

/// How much detail a catalog request wants back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RequestMode {
    /// List of items only.
    #[default]
    Summary,
    /// Full detail, optionally scoped to one dataset version.
    Full,
}

impl RequestMode {
    fn to_wire(self) -> i32 {
        match self {
            RequestMode::Summary => 0,
            RequestMode::Full => 1,
        }
    }

    fn from_wire(value: i32) -> Result<Self> {
        match value {
            0 => Ok(RequestMode::Summary),
            1 => Ok(RequestMode::Full),
            other => Err(WireError::MalformedMessage {
                context: format!("RequestOptions.mode: unknown mode {other}"),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub mode: RequestMode,
    /// Empty unless scoped to one dataset version (`"<uuid>[<version>]"`).
    pub data_source_proc_ref: String,
}

impl RequestOptions {
    pub fn summary() -> Self {
        Self::default()
    }

    /// Full detail for every item.
    pub fn full() -> Self {
        Self {
            mode: RequestMode::Full,
            data_source_proc_ref: String::new(),
        }
    }

    /// Full detail for one dataset version.
    pub fn full_for(proc_ref: ProcRef) -> Self {
        Self {
            mode: RequestMode::Full,
            data_source_proc_ref: proc_ref.to_string(),
        }
    }

    /// The dataset version this request is scoped to, if any.
    ///
    /// # Errors
    ///
    /// [`WireError::InvalidProcRef`] if the reference is present but does not
    /// parse.
    pub fn scope(&self) -> Result<Option<ProcRef>> {
        if self.data_source_proc_ref.is_empty() {
            return Ok(None);
        }
        self.data_source_proc_ref.parse().map(Some)
    }

    fn encode(&self, writer: &mut FieldWriter) {
        writer.put_i32(self.mode.to_wire());
        writer.put_text(&self.data_source_proc_ref);
    }

    fn decode(reader: &mut FieldReader) -> Result<Self> {
        let mode = RequestMode::from_wire(reader.read_i32("RequestOptions.mode")?)?;
        let data_source_proc_ref = reader.read_text("RequestOptions.data_source_proc_ref")?;
        Ok(Self {
            mode,
            data_source_proc_ref,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSources {
    pub published_items: Vec<PublishedItem>,
    pub options: RequestOptions,
}

impl Payload for DataSources {
    const KIND: MessageKind = MessageKind::DataSources;

    fn encode_payload(&self, writer: &mut FieldWriter) {
        writer.put_count(self.published_items.len());
        for item in &self.published_items {
            item.encode(writer);
        }
        self.options.encode(writer);
    }

    fn decode_payload(reader: &mut FieldReader) -> Result<Self> {
        let count = reader.read_count(MIN_ITEM_LEN, "DataSources.published_items")?;
        let mut published_items = Vec::with_capacity(count);
        for _ in 0..count {
            published_items.push(PublishedItem::decode(reader)?);
        }
        let options = RequestOptions::decode(reader)?;
        Ok(Self {
            published_items,
            options,
        })
    }
}
