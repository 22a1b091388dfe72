pub mod calendar;
pub mod config;
pub mod duration;
pub mod duration_validation;
pub mod expander;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod persistence;
pub mod preview;
pub mod template;

pub use calendar::{CalendarError, WorkCalendar, WorkCalendarConfig};
pub use config::{ConfigError, DayCounting, ExpansionConfig, MAX_CONFIGURABLE_OFFSET_DAYS};
pub use duration::{Duration, ParseError, RelativeOffset};
pub use duration_validation::{
    MAX_OFFSET_DAYS, OffsetError, OffsetLimits, ValidationError, parse_and_validate,
    parse_and_validate_with, validate, validate_with,
};
pub use expander::{
    ExpandedSchedule, ExpansionError, MilestoneDates, OffsetField, ScheduleExpander,
    ScheduleRow, ScheduleSummary, TaskDates, expand,
};
pub use persistence::{
    PersistenceError, PersistenceResult, load_expansion_config, load_template_from_json,
    save_schedule_to_csv, save_schedule_to_json, save_template_to_json,
};
pub use preview::{FieldIssue, PreviewService, PreviewStatus, preview};
pub use template::{
    MilestoneId, MilestoneNode, NodeRef, Priority, TaskId, TaskNode, TemplateError, TemplateGraph,
};
