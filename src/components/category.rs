use std::{collections::BTreeMap, fmt::Display};

use log::warn;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::errors::{LanduseError, Result};

/// World Reference Base soil groups, alphabetical, with 0 as open water.
const WRB_REFERENCE_GROUPS: [&str; 33] = [
    "Water",
    "Acrisols",
    "Alisols",
    "Andosols",
    "Anthrosols",
    "Arenosols",
    "Calcisols",
    "Cambisols",
    "Chernozems",
    "Cryosols",
    "Durisols",
    "Ferralsols",
    "Fluvisols",
    "Gleysols",
    "Gypsisols",
    "Histosols",
    "Kastanozems",
    "Leptosols",
    "Lixisols",
    "Luvisols",
    "Nitisols",
    "Phaeozems",
    "Planosols",
    "Plinthosols",
    "Podzols",
    "Regosols",
    "Retisols",
    "Solonchaks",
    "Solonetz",
    "Stagnosols",
    "Technosols",
    "Umbrisols",
    "Vertisols",
];

/// Mapping from integer cell values to labels.
#[derive(Shrinkwrap, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Legend(BTreeMap<i64, String>);

impl Legend {
    pub fn wrb_reference_groups() -> Self {
        WRB_REFERENCE_GROUPS
            .iter()
            .enumerate()
            .map(|(code, label)| (code as i64, label.to_string()))
            .collect()
    }
}

impl FromIterator<(i64, String)> for Legend {
    fn from_iter<I: IntoIterator<Item = (i64, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// How raw cell values are presented to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryKind {
    /// Integer class code, e.g. NLCD land cover.
    Code,
    /// Integer value looked up in a legend, e.g. soil groups.
    Label(Legend),
}

impl CategoryKind {
    pub fn coerce(&self, value: f64) -> Result<Category> {
        let code = value.to_i64().ok_or(LanduseError::Uncastable(value))?;
        Ok(match self {
            CategoryKind::Code => Category::Code(code),
            CategoryKind::Label(legend) => match legend.get(&code) {
                Some(label) => Category::Label(label.clone()),
                None => {
                    warn!("code {code} has no legend entry");
                    Category::Label(code.to_string())
                }
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Category {
    Code(i64),
    Label(String),
}

impl Category {
    pub fn code(&self) -> Option<i64> {
        match self {
            Category::Code(code) => Some(*code),
            Category::Label(_) => None,
        }
    }

    pub fn into_label(self) -> String {
        match self {
            Category::Code(code) => code.to_string(),
            Category::Label(label) => label,
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Code(code) => write!(f, "{code}"),
            Category::Label(label) => f.write_str(label),
        }
    }
}

/// Why a sample produced no category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoData {
    OutOfExtent,
    Sentinel,
    AccessFailure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryResult {
    Found(Category),
    NoData(NoData),
}

impl CategoryResult {
    pub fn is_found(&self) -> bool {
        matches!(self, CategoryResult::Found(_))
    }

    pub fn found(self) -> Option<Category> {
        match self {
            CategoryResult::Found(category) => Some(category),
            CategoryResult::NoData(_) => None,
        }
    }
}
