use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static TRACING_INSTALLED: OnceCell<()> = OnceCell::new();

const DEFAULT_FILTER: &str = "info";

/// 安装全局 fmt 订阅者；`RUST_LOG` 优先，否则使用 `info`。
/// 可重复调用，只有第一次生效。
pub fn init_tracing() {
    TRACING_INSTALLED.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        // 宿主进程可能已经装好了订阅者，此时保留对方的
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();
    });
}
