use std::collections::HashMap;
use std::path::Path;

use log::{debug, warn};
use serde::Serialize;

use crate::imaging::hsv::HsvRange;
use crate::shared::frame::Frame;
use crate::templates::template::{default_header_range, Template, TemplateKind};

/// All reference templates found in the asset directory, characterized
/// once at startup.
///
/// Loading is tolerant: a missing or unreadable file degrades the catalog
/// (logged and skipped), it never fails the loader. An empty catalog only
/// surfaces later, when selection finds nothing to choose from.
#[derive(Clone, Debug, Default)]
pub struct TemplateCatalog {
    templates: HashMap<TemplateKind, Template>,
}

/// Load-time metrics for one catalog entry.
#[derive(Clone, Debug, Serialize)]
pub struct TemplateInfo {
    pub kind: &'static str,
    pub brightness: f64,
    pub contrast: f64,
    pub header_color_ratio: f64,
    pub quality_score: f64,
}

/// Operator-facing overview of the loaded catalog.
#[derive(Clone, Debug, Serialize)]
pub struct CatalogSummary {
    pub total_templates: usize,
    pub entries: Vec<TemplateInfo>,
    pub best_kind: Option<&'static str>,
}

impl TemplateCatalog {
    /// Read every well-known template file under `assets_dir`.
    pub fn load(assets_dir: &Path) -> TemplateCatalog {
        Self::load_with_header_range(assets_dir, &default_header_range())
    }

    pub fn load_with_header_range(assets_dir: &Path, header_range: &HsvRange) -> TemplateCatalog {
        let mut templates = HashMap::new();
        for kind in TemplateKind::ALL {
            let path = assets_dir.join(kind.file_name());
            if !path.exists() {
                debug!("template asset {} not present, skipping", path.display());
                continue;
            }
            match image::open(&path) {
                Ok(decoded) => {
                    let frame = Frame::from_image(&decoded);
                    let template = Template::from_frame(kind, frame, header_range);
                    debug!(
                        "loaded template {} ({}x{}, quality {:.3})",
                        kind.as_str(),
                        template.width(),
                        template.height(),
                        template.quality_score
                    );
                    templates.insert(kind, template);
                }
                Err(e) => {
                    warn!("skipping unreadable template {}: {e}", path.display());
                }
            }
        }
        if templates.is_empty() {
            warn!(
                "no templates loaded from {}; detection will be unavailable",
                assets_dir.display()
            );
        }
        TemplateCatalog { templates }
    }

    /// Build a catalog from already-characterized templates.
    pub fn from_templates(templates: impl IntoIterator<Item = Template>) -> TemplateCatalog {
        TemplateCatalog {
            templates: templates.into_iter().map(|t| (t.kind, t)).collect(),
        }
    }

    pub fn get(&self, kind: TemplateKind) -> Option<&Template> {
        self.templates.get(&kind)
    }

    pub fn primary(&self) -> Option<&Template> {
        self.get(TemplateKind::Primary)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Templates with a usable header-color signature, best quality first.
    pub fn suitable_templates(&self, min_header_ratio: f64) -> Vec<&Template> {
        let mut suitable: Vec<&Template> = self
            .templates
            .values()
            .filter(|t| t.header_color_ratio > min_header_ratio)
            .collect();
        suitable.sort_by(|a, b| b.quality_score.partial_cmp(&a.quality_score).unwrap());
        suitable
    }

    pub fn summary(&self) -> CatalogSummary {
        let mut entries: Vec<TemplateInfo> = self
            .templates
            .values()
            .map(|t| TemplateInfo {
                kind: t.kind.as_str(),
                brightness: t.brightness,
                contrast: t.contrast,
                header_color_ratio: t.header_color_ratio,
                quality_score: t.quality_score,
            })
            .collect();
        entries.sort_by(|a, b| b.quality_score.partial_cmp(&a.quality_score).unwrap());
        CatalogSummary {
            total_templates: entries.len(),
            best_kind: entries.first().map(|e| e.kind),
            entries,
        }
    }
}
