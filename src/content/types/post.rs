//! Dated articles.

use super::{Comparator, ContentType, compare_by_date, new_unit, write_single};
use crate::{
    build::BuildContext,
    content::{ContentUnit, parser::ParsedSource},
    error::{BuildError, ErrorList},
};
use chrono::Local;

#[derive(Debug, Clone, Copy, Default)]
pub struct PostType;

impl ContentType for PostType {
    fn tag(&self) -> &'static str {
        "post"
    }

    /// Posts always carry a datetime; undated ones are stamped with the
    /// build time.
    fn create(
        &self,
        path: &str,
        source: ParsedSource,
        notes: &mut ErrorList,
    ) -> Result<ContentUnit, BuildError> {
        let mut unit = new_unit(self.tag(), path, source, self.extension(), notes);
        if unit.datetime.is_none() {
            unit.datetime = Some(Local::now().naive_local());
        }
        Ok(unit)
    }

    fn comparator(&self) -> Option<Comparator> {
        Some(compare_by_date)
    }

    fn generate(&self, unit: &ContentUnit, ctx: &mut BuildContext) -> Result<(), BuildError> {
        write_single(unit, ctx)
    }
}
