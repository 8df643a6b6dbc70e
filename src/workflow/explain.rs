//! 步骤追问缓存
//!
//! 按步骤号独立记录追问状态，同一步骤后发起的请求覆盖先发起的

use crate::error::AppResult;
use crate::models::solution::{ExplainKind, ExplanationRecord};
use std::collections::BTreeMap;

/// 一次追问请求的凭据，写回结果时用来判断是否已过期
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplainTicket {
    pub step_number: u32,
    generation: u64,
    epoch: u64,
}

#[derive(Debug, Clone)]
struct Entry {
    record: ExplanationRecord,
    generation: u64,
}

#[derive(Debug, Default)]
pub struct StepExplanations {
    entries: BTreeMap<u32, Entry>,
    next_generation: u64,
    epoch: u64,
}

impl StepExplanations {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开始追问：写入加载中的记录（覆盖该步骤已有的记录）
    pub fn begin(&mut self, step_number: u32, kind: ExplainKind) -> ExplainTicket {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.entries.insert(
            step_number,
            Entry {
                record: ExplanationRecord::pending(kind),
                generation,
            },
        );
        ExplainTicket {
            step_number,
            generation,
            epoch: self.epoch,
        }
    }

    /// 写回追问结果
    ///
    /// 凭据已过期（同一步骤有更新的请求，或缓存已清空）时不写入，返回 `false`。
    pub fn finish(&mut self, ticket: &ExplainTicket, outcome: &AppResult<String>) -> bool {
        if ticket.epoch != self.epoch {
            return false;
        }
        let Some(entry) = self.entries.get_mut(&ticket.step_number) else {
            return false;
        };
        if entry.generation != ticket.generation {
            return false;
        }

        entry.record.loading = false;
        match outcome {
            Ok(text) => {
                entry.record.text = Some(text.clone());
                entry.record.error = None;
            }
            Err(e) => {
                entry.record.text = None;
                entry.record.error = Some(e.user_message());
            }
        }
        true
    }

    pub fn get(&self, step_number: u32) -> Option<&ExplanationRecord> {
        self.entries.get(&step_number).map(|e| &e.record)
    }

    /// 按步骤号排序的全部记录
    pub fn records(&self) -> Vec<(u32, ExplanationRecord)> {
        self.entries
            .iter()
            .map(|(step, e)| (*step, e.record.clone()))
            .collect()
    }

    pub fn is_loading(&self, step_number: u32) -> bool {
        self.get(step_number).is_some_and(|r| r.loading)
    }

    /// 清空全部记录，尚未返回的请求随之失效
    pub fn clear(&mut self) {
        self.entries.clear();
        self.epoch += 1;
    }
}
