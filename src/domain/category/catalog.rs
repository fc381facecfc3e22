//! Category Catalog - 检测类别目录

use serde::Serialize;

use super::value_objects::CategoryId;

/// 检测类别 - 稳定 ID + 展示文案
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    /// 展示文案，仅供呈现，不参与路由解析
    pub label: &'static str,
    pub description: &'static str,
}

const CATALOG: &[Category] = &[
    Category {
        id: CategoryId::FasteningIntegrity,
        label: "Fastening Integrity Checks",
        description: "Checks if components are tightly secured-whether it's tyre bolts, telecom gear, retail fixtures, or appliance fittings.",
    },
    Category {
        id: CategoryId::ComponentIntegrity,
        label: "Component Integrity Validation",
        description: "Ensures only approved parts are used-right from tyre materials to telecom hardware, retail props, and service spares.",
    },
    Category {
        id: CategoryId::MeasurementAccuracy,
        label: "Measurement Accuracy Verification",
        description: "Verifies critical measurements like tread depth, antenna angle, shelf layout, or appliance fit-ensuring precision.",
    },
    Category {
        id: CategoryId::InstallationAccuracy,
        label: "Installation or Placement Accuracy",
        description: "Confirms everything is installed correctly-tread layers, router position, display setup or AC mounting.",
    },
    Category {
        id: CategoryId::DimensionalPrecision,
        label: "Distance & Dimensional Precision",
        description: "Validates spacing and alignment-between tyre plies, network points, store fixtures, or appliance connections.",
    },
];

/// 完整类别目录
pub fn catalog() -> &'static [Category] {
    CATALOG
}

impl CategoryId {
    /// 目录条目
    pub fn category(&self) -> &'static Category {
        let index = match self {
            CategoryId::FasteningIntegrity => 0,
            CategoryId::ComponentIntegrity => 1,
            CategoryId::MeasurementAccuracy => 2,
            CategoryId::InstallationAccuracy => 3,
            CategoryId::DimensionalPrecision => 4,
        };
        &CATALOG[index]
    }
}

impl Category {
    /// 按展示文案查找
    ///
    /// 展示层仍可能只持有文案；查不到返回 None，
    /// 由调用方决定是否降级到默认类别
    pub fn for_label(label: &str) -> Option<&'static Category> {
        CATALOG.iter().find(|c| c.label == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_entries_match_ids() {
        for entry in catalog() {
            assert_eq!(entry.id.category().id, entry.id);
        }
    }

    #[test]
    fn test_every_label_resolves() {
        for entry in catalog() {
            let found = Category::for_label(entry.label).unwrap();
            assert_eq!(found.id, entry.id);
        }
    }

    #[test]
    fn test_unknown_label_is_none() {
        assert!(Category::for_label("Tyre Balance Checks").is_none());
    }

    #[test]
    fn test_default_category_is_component_integrity() {
        assert_eq!(
            CategoryId::DEFAULT.category().label,
            "Component Integrity Validation"
        );
    }
}
