// ==========================================
// 分班选课系统 - 单写者服务句柄
// ==========================================
// 一个阻塞任务独占 RequestEngine, 调用方经 mpsc 发命令、oneshot 取结果
// 每个请求的 快照 → 校验 → 修改 → 持久化 → 审计 在该任务内串行完成
// 只读查询走 watch 发布的名册快照, 不会看到半完成的请求
// ==========================================

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use crate::domain::{EnrollmentChange, EnrollmentRequest};
use crate::engine::{
    EngineError, EngineResult, RejectReason, RequestEngine, RequestOutcome, RosterStore,
};
use crate::engine::AuditMode;

const COMMAND_BUFFER: usize = 64;

enum Command {
    Execute {
        student_id: String,
        change: EnrollmentChange,
        reply: oneshot::Sender<EngineResult<RequestOutcome>>,
    },
    Submit {
        request: EnrollmentRequest,
        reply: oneshot::Sender<usize>,
    },
    Pending {
        reply: oneshot::Sender<Vec<String>>,
    },
    ProcessPending {
        position: usize,
        reply: oneshot::Sender<EngineResult<RequestOutcome>>,
    },
    ProcessAll {
        reply: oneshot::Sender<EngineResult<Vec<RequestOutcome>>>,
    },
    DiscardPending {
        position: usize,
        reply: oneshot::Sender<Result<EnrollmentRequest, RejectReason>>,
    },
    DiscardAll {
        reply: oneshot::Sender<usize>,
    },
    Undo {
        seq: usize,
        reply: oneshot::Sender<EngineResult<RequestOutcome>>,
    },
    History {
        reply: oneshot::Sender<Vec<String>>,
    },
}

// ==========================================
// EnrollmentHandle
// ==========================================
#[derive(Clone)]
pub struct EnrollmentHandle {
    tx: mpsc::Sender<Command>,
    snapshot: watch::Receiver<Arc<RosterStore>>,
}

impl EnrollmentHandle {
    /// 启动服务任务 (须在 tokio 运行时内调用)
    pub fn spawn(engine: RequestEngine) -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshot_tx, snapshot) = watch::channel(Arc::new(engine.roster().clone()));

        tokio::task::spawn_blocking(move || run(engine, rx, snapshot_tx));
        Self { tx, snapshot }
    }

    /// 最近一次已提交状态的名册快照
    pub fn snapshot(&self) -> Arc<RosterStore> {
        self.snapshot.borrow().clone()
    }

    pub async fn execute(
        &self,
        student_id: impl Into<String>,
        change: EnrollmentChange,
    ) -> EngineResult<RequestOutcome> {
        let student_id = student_id.into();
        self.call(|reply| Command::Execute {
            student_id,
            change,
            reply,
        })
        .await?
    }

    pub async fn submit(&self, request: EnrollmentRequest) -> EngineResult<usize> {
        self.call(|reply| Command::Submit { request, reply }).await
    }

    pub async fn pending(&self) -> EngineResult<Vec<String>> {
        self.call(|reply| Command::Pending { reply }).await
    }

    pub async fn process_pending(&self, position: usize) -> EngineResult<RequestOutcome> {
        self.call(|reply| Command::ProcessPending { position, reply })
            .await?
    }

    pub async fn process_all_pending(&self) -> EngineResult<Vec<RequestOutcome>> {
        self.call(|reply| Command::ProcessAll { reply }).await?
    }

    pub async fn discard_pending(
        &self,
        position: usize,
    ) -> EngineResult<Result<EnrollmentRequest, RejectReason>> {
        self.call(|reply| Command::DiscardPending { position, reply })
            .await
    }

    pub async fn discard_all_pending(&self) -> EngineResult<usize> {
        self.call(|reply| Command::DiscardAll { reply }).await
    }

    pub async fn undo(&self, seq: usize) -> EngineResult<RequestOutcome> {
        self.call(|reply| Command::Undo { seq, reply }).await?
    }

    /// 审计日志摘要
    pub async fn history(&self) -> EngineResult<Vec<String>> {
        self.call(|reply| Command::History { reply }).await
    }

    async fn call<T, F>(&self, build: F) -> EngineResult<T>
    where
        F: FnOnce(oneshot::Sender<T>) -> Command,
    {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| EngineError::ServiceStopped)?;
        rx.await.map_err(|_| EngineError::ServiceStopped)
    }
}

fn run(
    mut engine: RequestEngine,
    mut rx: mpsc::Receiver<Command>,
    snapshot_tx: watch::Sender<Arc<RosterStore>>,
) {
    tracing::info!("选课服务已启动");
    // 先发布快照再回复, 调用方收到结果后读到的快照必然已包含本次变更
    let publish = |engine: &RequestEngine| {
        snapshot_tx.send_replace(Arc::new(engine.roster().clone()));
    };

    while let Some(command) = rx.blocking_recv() {
        match command {
            Command::Execute {
                student_id,
                change,
                reply,
            } => {
                let result = engine.execute(&student_id, &change, AuditMode::Record);
                if may_have_changed(&result) {
                    publish(&engine);
                }
                let _ = reply.send(result);
            }
            Command::Submit { request, reply } => {
                let _ = reply.send(engine.submit(request));
            }
            Command::Pending { reply } => {
                let _ = reply.send(engine.pending_summaries());
            }
            Command::ProcessPending { position, reply } => {
                let result = engine.process_pending(position);
                if may_have_changed(&result) {
                    publish(&engine);
                }
                let _ = reply.send(result);
            }
            Command::ProcessAll { reply } => {
                let result = engine.process_all_pending();
                // 出错时前面的请求可能已生效
                let changed = result
                    .as_ref()
                    .map(|outcomes| outcomes.iter().any(RequestOutcome::is_accepted))
                    .unwrap_or(true);
                if changed {
                    publish(&engine);
                }
                let _ = reply.send(result);
            }
            Command::DiscardPending { position, reply } => {
                let _ = reply.send(engine.discard_pending(position));
            }
            Command::DiscardAll { reply } => {
                let _ = reply.send(engine.discard_all_pending());
            }
            Command::Undo { seq, reply } => {
                let result = engine.undo(seq);
                if may_have_changed(&result) {
                    publish(&engine);
                }
                let _ = reply.send(result);
            }
            Command::History { reply } => {
                let _ = reply.send(engine.audit_log().summaries().collect());
            }
        }
    }
    tracing::info!("选课服务已停止");
}

/// 名册是否可能已变化 (持久化失败时内存已变更)
fn may_have_changed(result: &EngineResult<RequestOutcome>) -> bool {
    match result {
        Ok(outcome) => outcome.is_accepted(),
        Err(_) => true,
    }
}
