//! Standalone pages.

use super::{ContentType, write_single};
use crate::{build::BuildContext, content::ContentUnit, error::BuildError};

#[derive(Debug, Clone, Copy, Default)]
pub struct PageType;

impl ContentType for PageType {
    fn tag(&self) -> &'static str {
        "page"
    }

    fn generate(&self, unit: &ContentUnit, ctx: &mut BuildContext) -> Result<(), BuildError> {
        write_single(unit, ctx)
    }
}
