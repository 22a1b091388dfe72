use crate::config::{DayCounting, ExpansionConfig};
use crate::duration_validation::{self, OffsetError};
use crate::duration::RelativeOffset;
use crate::template::{MilestoneId, MilestoneNode, NodeRef, TaskId, TemplateGraph};
use chrono::{NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetField {
    StartOffset,
    DueOffset,
}

impl fmt::Display for OffsetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OffsetField::StartOffset => f.write_str("start_offset"),
            OffsetField::DueOffset => f.write_str("due_offset"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpansionError {
    #[error("{node} {field}: {source}")]
    InvalidOffset {
        node: NodeRef,
        field: OffsetField,
        source: OffsetError,
    },
    #[error("{node} {field}: resolved date is outside the supported range")]
    DateOutOfRange { node: NodeRef, field: OffsetField },
}

impl ExpansionError {
    pub fn node(&self) -> NodeRef {
        match self {
            ExpansionError::InvalidOffset { node, .. }
            | ExpansionError::DateOutOfRange { node, .. } => *node,
        }
    }

    pub fn field(&self) -> OffsetField {
        match self {
            ExpansionError::InvalidOffset { field, .. }
            | ExpansionError::DateOutOfRange { field, .. } => *field,
        }
    }

    pub fn offset_error(&self) -> Option<&OffsetError> {
        match self {
            ExpansionError::InvalidOffset { source, .. } => Some(source),
            ExpansionError::DateOutOfRange { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneDates {
    pub name: String,
    pub position: usize,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDates {
    pub milestone_id: MilestoneId,
    pub title: String,
    pub position: usize,
    pub due_date: NaiveDate,
}

/// Absolute dates for one instantiation of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandedSchedule {
    pub anchor: NaiveDate,
    pub milestones: BTreeMap<MilestoneId, MilestoneDates>,
    pub tasks: BTreeMap<TaskId, TaskDates>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleRow {
    pub kind: &'static str,
    pub id: u32,
    pub milestone_id: MilestoneId,
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub milestone_count: usize,
    pub task_count: usize,
    pub earliest_start: Option<NaiveDate>,
    pub latest_due: Option<NaiveDate>,
    pub span_days: i64,
}

impl ScheduleSummary {
    pub fn to_cli_summary(&self) -> String {
        let mut parts = vec![
            format!("milestones={}", self.milestone_count),
            format!("tasks={}", self.task_count),
        ];
        if let Some(date) = self.earliest_start {
            parts.push(format!("start={date}"));
        }
        if let Some(date) = self.latest_due {
            parts.push(format!("finish={date}"));
        }
        parts.push(format!("span={}d", self.span_days));
        parts.join(", ")
    }
}

impl ExpandedSchedule {
    pub fn milestone(&self, id: MilestoneId) -> Option<&MilestoneDates> {
        self.milestones.get(&id)
    }

    pub fn task(&self, id: TaskId) -> Option<&TaskDates> {
        self.tasks.get(&id)
    }

    /// Flat rows in template order: each milestone followed by its tasks.
    pub fn rows(&self) -> Vec<ScheduleRow> {
        let mut milestones: Vec<(&MilestoneId, &MilestoneDates)> =
            self.milestones.iter().collect();
        milestones.sort_by_key(|(_, m)| m.position);

        let mut rows = Vec::with_capacity(self.milestones.len() + self.tasks.len());
        for (id, milestone) in milestones {
            rows.push(ScheduleRow {
                kind: "milestone",
                id: *id,
                milestone_id: *id,
                name: milestone.name.clone(),
                start_date: Some(milestone.start_date),
                due_date: milestone.due_date,
            });
            let mut tasks: Vec<(&TaskId, &TaskDates)> = self
                .tasks
                .iter()
                .filter(|(_, t)| t.milestone_id == *id)
                .collect();
            tasks.sort_by_key(|(_, t)| t.position);
            rows.extend(tasks.into_iter().map(|(task_id, task)| ScheduleRow {
                kind: "task",
                id: *task_id,
                milestone_id: *id,
                name: task.title.clone(),
                start_date: None,
                due_date: task.due_date,
            }));
        }
        rows
    }

    pub fn summary(&self) -> ScheduleSummary {
        let earliest_start = self.milestones.values().map(|m| m.start_date).min();
        let latest_due = self
            .milestones
            .values()
            .map(|m| m.due_date)
            .chain(self.tasks.values().map(|t| t.due_date))
            .max();
        let span_days = match (earliest_start, latest_due) {
            (Some(start), Some(finish)) => (finish - start).num_days(),
            _ => 0,
        };
        ScheduleSummary {
            milestone_count: self.milestones.len(),
            task_count: self.tasks.len(),
            earliest_start,
            latest_due,
            span_days,
        }
    }
}

/// Resolves every relative offset in a template against a project anchor.
///
/// Anchoring is two-level: a milestone's start is measured from the project
/// anchor; its due date and every owned task's due date are measured from
/// that resolved start.
#[derive(Debug, Clone, Default)]
pub struct ScheduleExpander {
    config: ExpansionConfig,
}

impl ScheduleExpander {
    pub fn new(config: ExpansionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExpansionConfig {
        &self.config
    }

    /// All or nothing: the first bad offset aborts the whole expansion.
    pub fn expand(
        &self,
        graph: &TemplateGraph,
        anchor: NaiveDate,
    ) -> Result<ExpandedSchedule, ExpansionError> {
        let mut milestones = BTreeMap::new();
        let mut tasks = BTreeMap::new();

        for milestone in graph.milestones() {
            let node = NodeRef::Milestone { id: milestone.id };
            let start_date =
                self.resolve(node, OffsetField::StartOffset, &milestone.start_offset, anchor)?;
            let due_date =
                self.resolve(node, OffsetField::DueOffset, &milestone.due_offset, start_date)?;

            for task in &milestone.tasks {
                let task_node = NodeRef::Task {
                    milestone_id: milestone.id,
                    id: task.id,
                };
                let task_due =
                    self.resolve(task_node, OffsetField::DueOffset, &task.due_offset, start_date)?;
                tasks.insert(
                    task.id,
                    TaskDates {
                        milestone_id: milestone.id,
                        title: task.title.clone(),
                        position: task.position,
                        due_date: task_due,
                    },
                );
            }

            milestones.insert(milestone.id, milestone_dates(milestone, start_date, due_date));
        }

        Ok(ExpandedSchedule {
            anchor,
            milestones,
            tasks,
        })
    }

    /// Every offset failure in the graph, without stopping at the first.
    pub fn offset_errors(&self, graph: &TemplateGraph) -> Vec<ExpansionError> {
        let mut errors = Vec::new();
        let mut check = |node, field, offset: &RelativeOffset| {
            let parsed =
                duration_validation::parse_and_validate_with(offset.as_str(), self.config.limits());
            if let Err(source) = parsed {
                errors.push(ExpansionError::InvalidOffset { node, field, source });
            }
        };
        for milestone in graph.milestones() {
            let node = NodeRef::Milestone { id: milestone.id };
            check(node, OffsetField::StartOffset, &milestone.start_offset);
            check(node, OffsetField::DueOffset, &milestone.due_offset);
            for task in &milestone.tasks {
                let node = NodeRef::Task {
                    milestone_id: milestone.id,
                    id: task.id,
                };
                check(node, OffsetField::DueOffset, &task.due_offset);
            }
        }
        errors
    }

    fn resolve(
        &self,
        node: NodeRef,
        field: OffsetField,
        offset: &RelativeOffset,
        from: NaiveDate,
    ) -> Result<NaiveDate, ExpansionError> {
        let duration =
            duration_validation::parse_and_validate_with(offset.as_str(), self.config.limits())
                .map_err(|source| ExpansionError::InvalidOffset {
                    node,
                    field,
                    source,
                })?;

        let resolved = match &self.config.day_counting {
            DayCounting::Calendar => TimeDelta::try_days(duration.days())
                .and_then(|delta| from.checked_add_signed(delta)),
            DayCounting::WorkingDays { calendar } => {
                calendar.add_working_days(from, duration.days())
            }
        };
        resolved.ok_or(ExpansionError::DateOutOfRange { node, field })
    }
}

fn milestone_dates(
    milestone: &MilestoneNode,
    start_date: NaiveDate,
    due_date: NaiveDate,
) -> MilestoneDates {
    MilestoneDates {
        name: milestone.name.clone(),
        position: milestone.position,
        start_date,
        due_date,
    }
}

/// Expand with the default configuration (calendar days, 3650-day limit).
pub fn expand(
    graph: &TemplateGraph,
    anchor: NaiveDate,
) -> Result<ExpandedSchedule, ExpansionError> {
    ScheduleExpander::default().expand(graph, anchor)
}
