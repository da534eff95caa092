//! DTOs for decoding Open Brewery DB `/meta` responses.
//!
//! The upstream has shipped counts both as JSON numbers and as numeric
//! strings, so each count is decoded leniently and then validated once.

use brewery_query::ports::PageMeta;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum CountDto {
    Number(u64),
    Text(String),
}

impl CountDto {
    fn value(&self, field: &str) -> Result<u64, String> {
        match self {
            Self::Number(value) => Ok(*value),
            Self::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| format!("meta field `{field}` is not a count: {text:?}")),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct MetaDto {
    pub(super) total: CountDto,
    #[serde(default)]
    pub(super) per_page: Option<CountDto>,
    #[serde(default)]
    pub(super) page: Option<CountDto>,
}

impl MetaDto {
    pub(super) fn into_page_meta(self, requested_per_page: u32) -> Result<PageMeta, String> {
        let total = self.total.value("total")?;
        let per_page =
            optional_u32(self.per_page.as_ref(), "per_page")?.unwrap_or(requested_per_page);
        let page = optional_u32(self.page.as_ref(), "page")?.unwrap_or(1);
        Ok(PageMeta {
            total,
            per_page,
            page,
        })
    }
}

fn optional_u32(count: Option<&CountDto>, field: &str) -> Result<Option<u32>, String> {
    count
        .map(|count| {
            let value = count.value(field)?;
            u32::try_from(value).map_err(|_| format!("meta field `{field}` out of range: {value}"))
        })
        .transpose()
}
