//! Category Context - Value Objects

use serde::{Deserialize, Serialize};

/// 检测类别的稳定标识
///
/// 与展示文案解耦的 slug；文案变更不影响路由解析
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CategoryId {
    /// 紧固完整性检查
    FasteningIntegrity,
    /// 部件完整性验证
    ComponentIntegrity,
    /// 测量精度校验
    MeasurementAccuracy,
    /// 安装/摆放准确性
    InstallationAccuracy,
    /// 距离与尺寸精度
    DimensionalPrecision,
}

impl CategoryId {
    /// 未知输入的回退类别
    ///
    /// 与原始目录的回退目标一致：部件完整性验证
    pub const DEFAULT: CategoryId = CategoryId::ComponentIntegrity;

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryId::FasteningIntegrity => "fastening-integrity",
            CategoryId::ComponentIntegrity => "component-integrity",
            CategoryId::MeasurementAccuracy => "measurement-accuracy",
            CategoryId::InstallationAccuracy => "installation-accuracy",
            CategoryId::DimensionalPrecision => "dimensional-precision",
        }
    }

    /// 从稳定 slug 解析
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fastening-integrity" => Some(CategoryId::FasteningIntegrity),
            "component-integrity" => Some(CategoryId::ComponentIntegrity),
            "measurement-accuracy" => Some(CategoryId::MeasurementAccuracy),
            "installation-accuracy" => Some(CategoryId::InstallationAccuracy),
            "dimensional-precision" => Some(CategoryId::DimensionalPrecision),
            _ => None,
        }
    }

    /// 解析失败时回退到 [`CategoryId::DEFAULT`]
    ///
    /// 过期或拼错的类别标识降级为默认分析，而不是阻断用户
    pub fn parse_or_default(s: &str) -> Self {
        Self::parse(s).unwrap_or(Self::DEFAULT)
    }

    /// 解析远端路由
    ///
    /// 全函数：每个类别映射到唯一路由，不会失败
    pub fn route(&self) -> RemoteRoute {
        match self {
            CategoryId::FasteningIntegrity => RemoteRoute::new("fastening"),
            CategoryId::ComponentIntegrity => RemoteRoute::new("component"),
            CategoryId::MeasurementAccuracy => RemoteRoute::new("measurement"),
            CategoryId::InstallationAccuracy => RemoteRoute::new("placement"),
            CategoryId::DimensionalPrecision => RemoteRoute::new("dimension"),
        }
    }
}

impl std::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 远端路由 - 服务端路由片段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RemoteRoute {
    path: &'static str,
}

impl RemoteRoute {
    pub(crate) const fn new(path: &'static str) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &'static str {
        self.path
    }
}

impl std::fmt::Display for RemoteRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_round_trip() {
        for id in [
            CategoryId::FasteningIntegrity,
            CategoryId::ComponentIntegrity,
            CategoryId::MeasurementAccuracy,
            CategoryId::InstallationAccuracy,
            CategoryId::DimensionalPrecision,
        ] {
            assert_eq!(CategoryId::parse(id.as_str()), Some(id));
        }
    }

    #[test]
    fn test_unknown_id_falls_back_to_default() {
        assert_eq!(CategoryId::parse("tyre-balance"), None);
        assert_eq!(CategoryId::parse_or_default("tyre-balance"), CategoryId::DEFAULT);
        assert_eq!(
            CategoryId::parse_or_default("tyre-balance").route(),
            CategoryId::DEFAULT.route()
        );
    }

    #[test]
    fn test_route_is_deterministic() {
        assert_eq!(CategoryId::FasteningIntegrity.route().path(), "fastening");
        assert_eq!(
            CategoryId::FasteningIntegrity.route(),
            CategoryId::FasteningIntegrity.route()
        );
    }
}
