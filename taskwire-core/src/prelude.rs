//! Convenience re-export of the types most call sites need.

pub use crate::app::{AppBuilder, Application};
pub use crate::body::Body;
pub use crate::config::{ConfigValue, TaskwireConfig};
pub use crate::context::TaskContext;
pub use crate::convert::{Converter, ConvertError};
pub use crate::error::TaskError;
pub use crate::handler::{Handler, ParamBinding, ParamPlan, ParamSource};
pub use crate::manager::Manager;
pub use crate::middleware::{Middleware, Next};
pub use crate::registry::{TaskEntry, TaskRegistry};
pub use crate::result::{TaskResult, TaskStatus};
pub use crate::retry::{retry, RetryPolicy};
pub use crate::session::{Session, SessionField, SessionPool};
pub use crate::task::{Authorization, ParamValue, Task, TaskMetadata};
pub use crate::task_id::{Method, TaskId};
