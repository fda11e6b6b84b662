// ==========================================
// 分班选课系统 - 审计日志
// ==========================================
// 只追加; 位置 (从 1 开始) 即记录编号
// 写入顺序: 先持久化, 成功后再更新内存, 保证编号与存储一致
// ==========================================

use crate::domain::AuditRecord;
use crate::repository::{AuditRepository, RepositoryError, RepositoryResult};

pub struct AuditLog {
    records: Vec<AuditRecord>,
    repo: Box<dyn AuditRepository>,
}

impl AuditLog {
    /// 打开并加载已有日志
    pub fn open(repo: Box<dyn AuditRepository>) -> RepositoryResult<Self> {
        let records = repo.load_all()?;
        tracing::debug!(records = records.len(), "审计日志已加载");
        Ok(Self { records, repo })
    }

    pub fn append(&mut self, record: AuditRecord) -> RepositoryResult<()> {
        self.repo.append(&record)?;
        self.records.push(record);
        Ok(())
    }

    /// 第 seq 条 (从 1 开始)
    pub fn get(&self, seq: usize) -> Option<&AuditRecord> {
        seq.checked_sub(1).and_then(|i| self.records.get(i))
    }

    /// 删除第 seq 条, 其后记录编号依次前移
    pub fn remove(&mut self, seq: usize) -> RepositoryResult<AuditRecord> {
        if self.get(seq).is_none() {
            return Err(RepositoryError::not_found("audit", seq.to_string()));
        }
        self.repo.delete_at(seq)?;
        Ok(self.records.remove(seq - 1))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    /// 带编号的摘要, 惰性且可重复遍历 (克隆迭代器即可重新开始)
    pub fn summaries(&self) -> impl Iterator<Item = String> + Clone + '_ {
        self.records
            .iter()
            .enumerate()
            .map(|(i, record)| record.summary(i + 1))
    }
}
