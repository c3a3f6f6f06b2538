//! 服务与服务实例值对象

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 服务实例
///
/// `(address, port)` 唯一定位一个可达端点；`id` 在服务内唯一标识实例，
/// 与地址是否被复用无关。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceInstanceInfo {
    /// 实例 ID
    pub id: String,

    /// 所属服务名
    pub service_name: String,

    /// 协议（如 "grpc", "http"）
    pub protocol: String,

    /// 主机地址
    pub address: String,

    /// 端口
    pub port: u16,

    /// 所在节点
    pub node: String,

    /// 构建版本
    pub version: String,

    /// 构建提交
    pub commit: String,

    /// 构建分支
    pub branch: String,

    /// 是否健康（由健康检查组件切换）
    pub healthy: bool,

    /// 运维元数据，不参与序列化，不对外暴露
    #[serde(skip)]
    pub metadata: HashMap<String, String>,
}

impl ServiceInstanceInfo {
    /// 创建新的服务实例（默认健康）
    pub fn new(
        service_name: impl Into<String>,
        id: impl Into<String>,
        address: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            id: id.into(),
            service_name: service_name.into(),
            address: address.into(),
            port,
            healthy: true,
            ..Default::default()
        }
    }

    /// 设置协议
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    /// 设置节点
    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = node.into();
        self
    }

    /// 设置构建信息
    pub fn with_build(
        mut self,
        version: impl Into<String>,
        commit: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        self.version = version.into();
        self.commit = commit.into();
        self.branch = branch.into();
        self
    }

    /// 设置健康状态
    pub fn with_health(mut self, healthy: bool) -> Self {
        self.healthy = healthy;
        self
    }

    /// 添加元数据
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// 可拨号地址，格式为 `host:port`，IPv6 字面量加方括号
    pub fn addr(&self) -> String {
        if self.address.contains(':') && !self.address.starts_with('[') {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }
}

/// 服务：名称及其当前实例列表
///
/// 实例顺序由后端决定，不做额外保证。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceInfo {
    pub name: String,
    pub instances: Vec<ServiceInstanceInfo>,
}

impl ServiceInfo {
    pub fn new(name: impl Into<String>, instances: Vec<ServiceInstanceInfo>) -> Self {
        Self {
            name: name.into(),
            instances,
        }
    }

    /// 按实例 ID 查找
    pub fn instance(&self, id: &str) -> Option<&ServiceInstanceInfo> {
        self.instances.iter().find(|inst| inst.id == id)
    }

    /// 所有实例的可拨号地址，保持实例顺序
    pub fn addrs(&self) -> Vec<String> {
        self.instances.iter().map(ServiceInstanceInfo::addr).collect()
    }
}
