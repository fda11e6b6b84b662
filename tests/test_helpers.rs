// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 在临时数据目录中生成 CSV 数据集, 并按配置打开引擎
// ==========================================

#![allow(dead_code)]

use enrollment_engine::config::{EngineConfig, StorageBackend, StorageConfig};
use enrollment_engine::{AppState, RequestEngine};
use std::error::Error;
use std::fs;
use tempfile::TempDir;

/// 临时数据集构建器
///
/// 文件格式与正式数据目录一致:
/// - classes.csv: ClassCode,UcCode,Weekday,StartHour,Duration,Type
/// - classes_per_uc.csv: UcCode,ClassCode
/// - students_classes.csv: StudentCode,StudentName,UcCode,ClassCode
#[derive(Default)]
pub struct CampusBuilder {
    lectures: Vec<String>,
    pairings: Vec<String>,
    roster: Vec<String>,
    audit: Vec<String>,
}

impl CampusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lecture(mut self, section: &str, uc: &str, weekday: &str, start: f64, duration: f64) -> Self {
        self.lectures
            .push(format!("{},{},{},{},{},T", section, uc, weekday, start, duration));
        self
    }

    pub fn pairing(mut self, section: &str, uc: &str) -> Self {
        self.pairings.push(format!("{},{}", uc, section));
        self
    }

    pub fn enrolled(mut self, student_id: &str, name: &str, uc: &str, section: &str) -> Self {
        self.roster
            .push(format!("{},{},{},{}", student_id, name, uc, section));
        self
    }

    /// 批量生成 count 名只选了 uc/section 的学生, 学号为 prefix + 序号
    pub fn crowd(mut self, prefix: &str, count: usize, uc: &str, section: &str) -> Self {
        for i in 1..=count {
            let id = format!("{}{:03}", prefix, i);
            let name = format!("Student{}{:03}", prefix, i);
            self = self.enrolled(&id, &name, uc, section);
        }
        self
    }

    /// 预置审计记录: kind,uc,source,dest (不适用字段写 "-")
    pub fn audit(mut self, student_id: &str, name: &str, kind: &str, uc: &str, source: &str, dest: &str) -> Self {
        self.audit.push(format!(
            "{},{},{},{},{},{}",
            student_id, name, kind, uc, source, dest
        ));
        self
    }

    /// 写出 CSV 文件
    pub fn build(self) -> Result<TestCampus, Box<dyn Error>> {
        let dir = TempDir::new()?;
        let storage = StorageConfig::in_dir(dir.path());

        write_csv(
            &storage.schedule_path(),
            "ClassCode,UcCode,Weekday,StartHour,Duration,Type",
            &self.lectures,
        )?;
        write_csv(&storage.pairing_path(), "UcCode,ClassCode", &self.pairings)?;
        write_csv(
            &storage.roster_path(),
            "StudentCode,StudentName,UcCode,ClassCode",
            &self.roster,
        )?;
        if !self.audit.is_empty() {
            write_csv(
                &storage.audit_path(),
                "StudentCode,StudentName,Type,UcCode,StartCode,EndCode",
                &self.audit,
            )?;
        }

        let config = EngineConfig {
            storage,
            ..EngineConfig::default()
        };
        Ok(TestCampus { dir, config })
    }
}

fn write_csv(path: &std::path::Path, header: &str, rows: &[String]) -> Result<(), Box<dyn Error>> {
    let mut content = String::from(header);
    content.push('\n');
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    fs::write(path, content)?;
    Ok(())
}

/// 已写出的临时数据集 (TempDir 需保持存活)
pub struct TestCampus {
    pub dir: TempDir,
    pub config: EngineConfig,
}

impl TestCampus {
    /// 切换存储后端
    pub fn with_backend(mut self, backend: StorageBackend) -> Self {
        self.config.storage.backend = backend;
        self
    }

    pub fn open_engine(&self) -> Result<RequestEngine, Box<dyn Error>> {
        Ok(AppState::open(self.config.clone())?.into_engine())
    }

    pub fn read_roster(&self) -> Result<String, Box<dyn Error>> {
        Ok(fs::read_to_string(self.config.storage.roster_path())?)
    }

    pub fn read_audit(&self) -> Result<String, Box<dyn Error>> {
        Ok(fs::read_to_string(self.config.storage.audit_path())?)
    }
}
