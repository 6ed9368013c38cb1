//! JSON-backed metadata registry.
//!
//! Document shape:
//!
//! ```json
//! {
//!   "index": { "code": "SSPI", "pillars": [
//!     { "code": "SUS", "categories": [
//!       { "code": "ECO", "indicators": [
//!         { "code": "BIODIV", "goalposts": { "lower": 0, "upper": 100 },
//!           "datasets": ["UNSDG_MARINE", "UNSDG_TERRST"] } ] } ] } ] },
//!   "datasets": [
//!     { "code": "UNSDG_MARINE", "goalposts": { "lower": 0, "upper": 100 },
//!       "source": { "OrganizationCode": "UNSDG", "QueryCode": "14.5.1" } } ],
//!   "country_groups": { "SSPI49": ["AUS", "AUT"] }
//! }
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::path::Path;

use serde::Deserialize;

use crate::domain::Goalposts;
use crate::error::EngineError;
use crate::registry::{MetadataRegistry, SourceInfo};

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryDocument {
    pub index: IndexNode,
    #[serde(default)]
    pub datasets: Vec<DatasetNode>,
    #[serde(default)]
    pub country_groups: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexNode {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub pillars: Vec<PillarNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PillarNode {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub categories: Vec<CategoryNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryNode {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub indicators: Vec<IndicatorNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndicatorNode {
    pub code: String,
    #[serde(default)]
    pub name: String,
    pub goalposts: Option<Goalposts>,
    #[serde(default)]
    pub datasets: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetNode {
    pub code: String,
    #[serde(default)]
    pub description: String,
    pub goalposts: Option<Goalposts>,
    #[serde(default)]
    pub source: SourceInfo,
}

/// In-memory registry built from a `RegistryDocument`.
#[derive(Debug, Clone)]
pub struct StaticRegistry {
    doc: RegistryDocument,
    datasets: HashMap<String, usize>,
    goalposts: HashMap<String, Goalposts>,
}

impl StaticRegistry {
    pub fn from_document(doc: RegistryDocument) -> Result<Self, EngineError> {
        let mut datasets = HashMap::new();
        let mut goalposts = HashMap::new();

        for (idx, node) in doc.datasets.iter().enumerate() {
            if datasets.insert(node.code.clone(), idx).is_some() {
                return Err(EngineError::Parse(format!("duplicate dataset code `{}`", node.code)));
            }
            if let Some(gp) = node.goalposts {
                goalposts.insert(node.code.clone(), gp);
            }
        }

        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(doc.index.code.as_str());
        for pillar in &doc.index.pillars {
            check_unique(&mut seen, &pillar.code)?;
            for category in &pillar.categories {
                check_unique(&mut seen, &category.code)?;
                for indicator in &category.indicators {
                    check_unique(&mut seen, &indicator.code)?;
                    if let Some(missing) = indicator.datasets.iter().find(|d| !datasets.contains_key(*d)) {
                        return Err(EngineError::Parse(format!(
                            "indicator `{}` depends on undeclared dataset `{missing}`",
                            indicator.code
                        )));
                    }
                    if let Some(gp) = indicator.goalposts {
                        goalposts.insert(indicator.code.clone(), gp);
                    }
                }
            }
        }

        Ok(Self {
            doc,
            datasets,
            goalposts,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let doc: RegistryDocument =
            serde_json::from_str(json).map_err(|e| EngineError::Parse(format!("invalid registry JSON: {e}")))?;
        Self::from_document(doc)
    }

    pub fn from_path(path: &Path) -> Result<Self, EngineError> {
        let file = File::open(path)
            .map_err(|e| EngineError::Io(format!("failed to open registry '{}': {e}", path.display())))?;
        let doc: RegistryDocument = serde_json::from_reader(file)
            .map_err(|e| EngineError::Parse(format!("invalid registry JSON '{}': {e}", path.display())))?;
        Self::from_document(doc)
    }

    pub fn index_code(&self) -> &str {
        &self.doc.index.code
    }

    fn indicators(&self) -> impl Iterator<Item = &IndicatorNode> {
        self.doc
            .index
            .pillars
            .iter()
            .flat_map(|p| p.categories.iter())
            .flat_map(|c| c.indicators.iter())
    }
}

fn check_unique<'a>(seen: &mut HashSet<&'a str>, code: &'a str) -> Result<(), EngineError> {
    if seen.insert(code) {
        Ok(())
    } else {
        Err(EngineError::Parse(format!("duplicate tree code `{code}`")))
    }
}

fn push_unique(out: &mut Vec<String>, codes: &[String]) {
    for code in codes {
        if !out.contains(code) {
            out.push(code.clone());
        }
    }
}

impl MetadataRegistry for StaticRegistry {
    fn goalposts(&self, item_code: &str) -> Result<Goalposts, EngineError> {
        self.goalposts
            .get(item_code)
            .copied()
            .ok_or_else(|| EngineError::UnknownItem(item_code.to_string()))
    }

    fn source_info(&self, dataset_code: &str) -> Result<SourceInfo, EngineError> {
        self.datasets
            .get(dataset_code)
            .map(|&idx| self.doc.datasets[idx].source.clone())
            .ok_or_else(|| EngineError::UnknownItem(dataset_code.to_string()))
    }

    fn dataset_dependencies(&self, item_code: &str) -> Result<Vec<String>, EngineError> {
        let mut out = Vec::new();

        if item_code == self.doc.index.code {
            for indicator in self.indicators() {
                push_unique(&mut out, &indicator.datasets);
            }
            return Ok(out);
        }

        for pillar in &self.doc.index.pillars {
            let pillar_hit = pillar.code == item_code;
            for category in &pillar.categories {
                let category_hit = pillar_hit || category.code == item_code;
                for indicator in &category.indicators {
                    if category_hit || indicator.code == item_code {
                        push_unique(&mut out, &indicator.datasets);
                        if indicator.code == item_code {
                            return Ok(out);
                        }
                    }
                }
                if category.code == item_code {
                    return Ok(out);
                }
            }
            if pillar_hit {
                return Ok(out);
            }
        }

        if self.datasets.contains_key(item_code) {
            return Ok(vec![item_code.to_string()]);
        }
        Err(EngineError::UnknownItem(item_code.to_string()))
    }

    fn country_group(&self, name: &str) -> Result<Vec<String>, EngineError> {
        self.doc
            .country_groups
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownItem(name.to_string()))
    }

    fn indicator_codes(&self) -> Vec<String> {
        self.indicators().map(|i| i.code.clone()).collect()
    }

    fn category_codes(&self) -> Vec<String> {
        self.doc
            .index
            .pillars
            .iter()
            .flat_map(|p| p.categories.iter().map(|c| c.code.clone()))
            .collect()
    }

    fn pillar_codes(&self) -> Vec<String> {
        self.doc.index.pillars.iter().map(|p| p.code.clone()).collect()
    }
}
