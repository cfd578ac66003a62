//! 报告状态机
//!
//! 管理报告从草稿、终审到补充报告的状态转换

use pacs_core::{PacsError, ReportStatus, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 报告状态转换事件
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ReportEvent {
    Edit,
    Finalize,
    OpenAddendum,
    SaveAddendum,
}

/// 报告状态机
#[derive(Debug)]
pub struct ReportStateMachine {
    transitions: HashMap<(ReportStatus, ReportEvent), ReportStatus>,
}

impl ReportStateMachine {
    /// 创建新的状态机实例
    pub fn new() -> Self {
        let mut transitions = HashMap::new();

        // 定义状态转换规则
        transitions.insert((ReportStatus::Draft, ReportEvent::Edit), ReportStatus::Draft);
        transitions.insert((ReportStatus::Draft, ReportEvent::Finalize), ReportStatus::Final);
        transitions.insert((ReportStatus::Final, ReportEvent::OpenAddendum), ReportStatus::AddendumPending);
        transitions.insert((ReportStatus::AddendumPending, ReportEvent::Edit), ReportStatus::AddendumPending);
        transitions.insert((ReportStatus::AddendumPending, ReportEvent::SaveAddendum), ReportStatus::Addendum);

        Self { transitions }
    }

    /// 检查状态转换是否有效
    pub fn can_transition(&self, from: ReportStatus, event: ReportEvent) -> bool {
        self.transitions.contains_key(&(from, event))
    }

    /// 执行状态转换
    pub fn transition(&self, from: ReportStatus, event: ReportEvent) -> Result<ReportStatus> {
        match self.transitions.get(&(from, event)) {
            Some(to) => Ok(*to),
            None => Err(PacsError::InvalidStateTransition {
                from: from.to_string(),
                event: format!("{:?}", event),
            }),
        }
    }

    /// 获取所有可能的状态
    pub fn get_all_states() -> Vec<ReportStatus> {
        vec![
            ReportStatus::Draft,
            ReportStatus::Final,
            ReportStatus::AddendumPending,
            ReportStatus::Addendum,
        ]
    }

    /// 获取状态的所有可能事件
    pub fn get_possible_events(&self, current_state: ReportStatus) -> Vec<ReportEvent> {
        self.transitions
            .keys()
            .filter(|(state, _)| *state == current_state)
            .map(|(_, event)| *event)
            .collect()
    }

    /// 终态：没有任何可触发的事件（Final 仍可打开补充报告）
    pub fn is_terminal(&self, state: ReportStatus) -> bool {
        self.get_possible_events(state).is_empty()
    }

    /// 正文和图像是否允许编辑
    pub fn sections_editable(&self, state: ReportStatus) -> bool {
        self.can_transition(state, ReportEvent::Edit)
    }
}

impl Default for ReportStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
