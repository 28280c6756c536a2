//! Section partitioning
//!
//! Splits the compiled tag stream at `0/SECTION 2/<name>` ... `0/ENDSEC`
//! into raw sections. Nothing inside a section is interpreted here.

use super::Auditor;
use crate::document::RawSection;
use crate::error::{DxfError, Result};
use crate::tags::group_code::NAME_CODE;
use crate::tags::Tag;
use tracing::debug;

/// Partition the tag stream into sections in file order.
///
/// Tags outside of any section and sections without `ENDSEC` are
/// structure findings. Anything after `0/EOF` is ignored.
pub(crate) fn partition(tags: Vec<Tag>, auditor: &mut Auditor) -> Result<Vec<RawSection>> {
    let mut sections = Vec::new();
    let mut previous: Option<String> = None;
    let mut iter = tags.into_iter().peekable();
    let mut stray = 0usize;

    while let Some(tag) = iter.next() {
        if tag.is_struct("EOF") {
            break;
        }
        if !tag.is_struct("SECTION") {
            stray += 1;
            continue;
        }
        if stray > 0 {
            auditor.report(stray_tags(stray), None)?;
            stray = 0;
        }

        let name = match iter.peek() {
            Some(next) if next.code == NAME_CODE => {
                iter.next().and_then(|t| t.as_str().map(str::to_string))
            }
            _ => None,
        };
        let Some(name) = name else {
            auditor.report(
                DxfError::Structure("SECTION without a name".to_string()),
                None,
            )?;
            // skip to the matching ENDSEC
            for tag in iter.by_ref() {
                if tag.is_struct("ENDSEC") {
                    break;
                }
            }
            continue;
        };

        let mut content = Vec::new();
        let mut closed = false;
        while let Some(next) = iter.peek() {
            if next.is_struct("SECTION") || next.is_struct("EOF") {
                break;
            }
            let Some(tag) = iter.next() else { break };
            if tag.is_struct("ENDSEC") {
                closed = true;
                break;
            }
            content.push(tag);
        }
        if !closed {
            auditor.report(
                DxfError::Structure(format!("section {} without ENDSEC", name)),
                None,
            )?;
        }

        debug!(section = %name, tags = content.len(), "partitioned section");
        sections.push(RawSection {
            name: name.clone(),
            tags: content,
            after: previous.replace(name),
        });
    }
    if stray > 0 {
        auditor.report(stray_tags(stray), None)?;
    }
    Ok(sections)
}

fn stray_tags(count: usize) -> DxfError {
    DxfError::Structure(format!("{} tags outside of any section", count))
}
