//! Grid location (stagger) tags carried by every field.

use serde::{Deserialize, Serialize};

/// Where on the grid cell the values of a field live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellLoc {
    /// Cell centre (unstaggered)
    #[default]
    Centre,
    /// Lower x face
    XLow,
    /// Lower y face
    YLow,
    /// Lower z face
    ZLow,
}

impl std::fmt::Display for CellLoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CellLoc::Centre => "CELL_CENTRE",
            CellLoc::XLow => "CELL_XLOW",
            CellLoc::YLow => "CELL_YLOW",
            CellLoc::ZLow => "CELL_ZLOW",
        };
        f.write_str(name)
    }
}
