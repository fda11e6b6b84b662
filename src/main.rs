// ==========================================
// 分班选课系统 - 命令行入口
// ==========================================
// 用法: enrollment-engine [--config PATH] [--set KEY=VALUE]... <命令> [参数...]
// 写操作经单写者服务句柄执行, 报表查询读取名册快照
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use enrollment_engine::config::ConfigManager;
use enrollment_engine::domain::{format_hour, weekday_name, EnrollmentChange, EnrollmentRequest, SortOrder, Student};
use enrollment_engine::{logging, AppState, EnrollmentHandle, RequestOutcome};
use std::path::Path;

const USAGE: &str = "\
用法: enrollment-engine [--config PATH] [--set KEY=VALUE]... <命令> [参数...]

写操作:
  add <学号> <课程单元>
  remove <学号> <课程单元>
  switch <学号> <课程单元> <源班级> <目标班级>
  undo <记录编号>
  batch <请求文件>          每行: add|remove|switch ... (同上参数), 先入队再统一处理

查询:
  history                    审计日志
  summary                    名册概况
  schedule <学号>            学生课表
  section <班级>             班级课表
  students section|year|uc|program <值> [name|name-desc|id|id-desc]
  count <n>                  至少选了 n 门课程单元的学生数
  top                        人数最多的课程单元
  config                     当前配置快照";

struct Invocation {
    config_path: Option<String>,
    overrides: Vec<(String, String)>,
    command: Vec<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Invocation> {
    let mut invocation = Invocation {
        config_path: None,
        overrides: Vec::new(),
        command: Vec::new(),
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                invocation.config_path = Some(args.next().context("--config 缺少路径")?);
            }
            "--set" => {
                let pair = args.next().context("--set 缺少 KEY=VALUE")?;
                let (key, value) = pair
                    .split_once('=')
                    .ok_or_else(|| anyhow!("--set 参数格式应为 KEY=VALUE: {}", pair))?;
                invocation.overrides.push((key.to_string(), value.to_string()));
            }
            _ => {
                invocation.command.push(arg);
                invocation.command.extend(args.by_ref());
            }
        }
    }
    Ok(invocation)
}

fn arg<'a>(command: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    command
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("缺少参数 <{}>\n\n{}", name, USAGE))
}

fn parse_change(command: &[String]) -> Result<(String, EnrollmentChange)> {
    let kind = arg(command, 0, "命令")?;
    let student = arg(command, 1, "学号")?.to_string();
    let course_unit = arg(command, 2, "课程单元")?;
    let change = match kind {
        "add" => EnrollmentChange::add(course_unit),
        "remove" => EnrollmentChange::remove(course_unit),
        "switch" => EnrollmentChange::switch(
            course_unit,
            arg(command, 3, "源班级")?,
            arg(command, 4, "目标班级")?,
        ),
        other => bail!("未知的请求类型: {}", other),
    };
    Ok((student, change))
}

fn print_outcome(outcome: &RequestOutcome) {
    println!("{}", outcome);
}

fn print_students(students: &[&Student], order: SortOrder) {
    println!("共 {} 人 ({})", students.len(), order);
    for s in students {
        if order.is_alphabetic() {
            println!("{}  {}", s.name, s.id);
        } else {
            println!("{}  {}", s.id, s.name);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let invocation = parse_args(std::env::args().skip(1))?;
    if invocation.command.is_empty() {
        println!("{}", USAGE);
        return Ok(());
    }

    let mut manager = match &invocation.config_path {
        Some(path) => ConfigManager::load(Path::new(path))?,
        None => ConfigManager::from_env()?,
    };
    for (key, value) in &invocation.overrides {
        manager.set_config_value(key, value)?;
    }

    let command = invocation.command;
    if command[0] == "config" {
        println!("{}", manager.get_config_snapshot()?);
        return Ok(());
    }

    tracing::info!("{} v{}", enrollment_engine::APP_NAME, enrollment_engine::VERSION);
    let state = tokio::task::block_in_place(|| AppState::open(manager.into_config()))
        .context("无法初始化AppState")?;
    let handle = EnrollmentHandle::spawn(state.into_engine());

    match command[0].as_str() {
        "add" | "remove" | "switch" => {
            let (student, change) = parse_change(&command)?;
            print_outcome(&handle.execute(student, change).await?);
        }
        "undo" => {
            let seq: usize = arg(&command, 1, "记录编号")?.parse().context("记录编号必须是正整数")?;
            print_outcome(&handle.undo(seq).await?);
        }
        "batch" => {
            let path = arg(&command, 1, "请求文件")?;
            let content = std::fs::read_to_string(path).with_context(|| format!("无法读取 {}", path))?;
            for line in content.lines().map(str::trim).filter(|l| !l.is_empty() && !l.starts_with('#')) {
                let fields: Vec<String> = line.split_whitespace().map(str::to_string).collect();
                let (student, change) = parse_change(&fields)?;
                handle.submit(EnrollmentRequest::new(student, change)).await?;
            }
            println!("待处理请求:");
            for summary in handle.pending().await? {
                println!("  {}", summary);
            }
            for (i, outcome) in handle.process_all_pending().await?.iter().enumerate() {
                println!("#{} {}", i + 1, outcome);
            }
        }
        "history" => {
            for summary in handle.history().await? {
                println!("{}", summary);
            }
        }
        "summary" => {
            let roster = handle.snapshot();
            let (units, count) = roster.most_populated_course_units();
            println!("专业: {}", roster.program_code());
            println!("学生: {}", roster.student_count());
            println!("审计记录: {}", handle.history().await?.len());
            println!("人数最多的课程单元: {} ({} 人)", units.join(", "), count);
        }
        "schedule" => {
            let id = arg(&command, 1, "学号")?;
            let roster = handle.snapshot();
            let lectures = roster
                .student_schedule(id)
                .ok_or_else(|| anyhow!("student not found: {}", id))?;
            for l in lectures {
                println!(
                    "{:<9} {}-{}  {:<10} {}",
                    weekday_name(l.weekday),
                    format_hour(l.start_hour),
                    format_hour(l.end_hour()),
                    l.course_unit,
                    l.kind
                );
            }
        }
        "section" => {
            let code = arg(&command, 1, "班级")?;
            let roster = handle.snapshot();
            for l in roster.section_schedule(code).sorted_lectures() {
                println!("{}", l);
            }
        }
        "students" => {
            let scope = arg(&command, 1, "范围")?;
            let value = arg(&command, 2, "值")?;
            let order = match command.get(3) {
                Some(s) => SortOrder::from_str(s).ok_or_else(|| anyhow!("未知排序方式: {}", s))?,
                None => SortOrder::NameAscending,
            };
            let roster = handle.snapshot();
            let students = match scope {
                "section" => roster.students_in_section(value, order),
                "year" => roster.students_in_year(value, order),
                "uc" => roster.students_in_course_unit(value, order),
                "program" => roster.students_in_program(value, order),
                other => bail!("未知范围: {}", other),
            };
            print_students(&students, order);
        }
        "count" => {
            let n: usize = arg(&command, 1, "n")?.parse().context("n 必须是非负整数")?;
            println!("{}", handle.snapshot().count_students_with_at_least(n));
        }
        "top" => {
            let (units, count) = handle.snapshot().most_populated_course_units();
            for uc in units {
                println!("{} {}", uc, count);
            }
        }
        other => bail!("未知命令: {}\n\n{}", other, USAGE),
    }

    Ok(())
}
