use crate::duration::RelativeOffset;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub type MilestoneId = u32;
pub type TaskId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(format!("unknown priority '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskNode {
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
    pub position: usize,
    /// Measured from the owning milestone's resolved start.
    pub due_offset: RelativeOffset,
}

/// `position` and the order of `tasks` belong to the owning graph; its
/// mutators keep them dense. A caller that edits them through
/// [`TemplateGraph::milestone_mut`] must pass the graph back through
/// [`TemplateGraph::validate_structure`] before trusting it again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneNode {
    pub id: MilestoneId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub position: usize,
    /// Measured from the project anchor.
    pub start_offset: RelativeOffset,
    /// Measured from this milestone's resolved start, not the project anchor.
    pub due_offset: RelativeOffset,
    #[serde(default)]
    pub tasks: Vec<TaskNode>,
}

impl MilestoneNode {
    pub fn task(&self, id: TaskId) -> Option<&TaskNode> {
        self.tasks.iter().find(|t| t.id == id)
    }
}

/// Identifies the node an offset belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeRef {
    Milestone { id: MilestoneId },
    Task { milestone_id: MilestoneId, id: TaskId },
}

impl NodeRef {
    pub fn id(&self) -> u32 {
        match self {
            NodeRef::Milestone { id } | NodeRef::Task { id, .. } => *id,
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Milestone { id } => write!(f, "milestone {id}"),
            NodeRef::Task { milestone_id, id } => write!(f, "task {id} (milestone {milestone_id})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("milestone {0} not found")]
    MilestoneNotFound(MilestoneId),
    #[error("task {task} not found in milestone {milestone}")]
    TaskNotFound { milestone: MilestoneId, task: TaskId },
    #[error("invalid reorder: {0}")]
    InvalidReorder(String),
    #[error("duplicate node id {0}")]
    DuplicateId(u32),
    #[error("no node ids left to allocate")]
    IdsExhausted,
    #[error("{node} has position {found}, expected {expected}")]
    PositionMismatch {
        node: NodeRef,
        found: usize,
        expected: usize,
    },
}

/// Ordered milestones, each owning ordered tasks.
///
/// Positions are kept dense and zero-based after every mutation, so the
/// vector order and the `position` fields always agree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateGraph {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    milestones: Vec<MilestoneNode>,
    #[serde(skip)]
    next_id: u64,
}

// The id allocator is not part of a template's identity.
impl PartialEq for TemplateGraph {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.description == other.description
            && self.milestones == other.milestones
    }
}

impl TemplateGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            milestones: Vec::new(),
            next_id: 1,
        }
    }

    pub fn milestones(&self) -> &[MilestoneNode] {
        &self.milestones
    }

    pub fn task_count(&self) -> usize {
        self.milestones.iter().map(|m| m.tasks.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.milestones.is_empty()
    }

    pub fn milestone(&self, id: MilestoneId) -> Option<&MilestoneNode> {
        self.milestones.iter().find(|m| m.id == id)
    }

    pub fn milestone_mut(&mut self, id: MilestoneId) -> Option<&mut MilestoneNode> {
        self.milestones.iter_mut().find(|m| m.id == id)
    }

    pub fn task(&self, id: TaskId) -> Option<(&MilestoneNode, &TaskNode)> {
        self.milestones
            .iter()
            .find_map(|m| m.task(id).map(|t| (m, t)))
    }

    /// Never hands out an id at or below one already present, so ids of
    /// removed nodes are not reused.
    fn allocate_id(&mut self) -> Result<u32, TemplateError> {
        let floor = u64::from(self.max_id()) + 1;
        let id = self.next_id.max(floor);
        let allocated = u32::try_from(id).map_err(|_| TemplateError::IdsExhausted)?;
        self.next_id = id + 1;
        Ok(allocated)
    }

    fn max_id(&self) -> u32 {
        self.milestones
            .iter()
            .flat_map(|m| std::iter::once(m.id).chain(m.tasks.iter().map(|t| t.id)))
            .max()
            .unwrap_or(0)
    }

    /// Insert a milestone directly after `after_position`, or append when `None`.
    /// Positions past the end append.
    pub fn add_milestone(
        &mut self,
        name: impl Into<String>,
        start_offset: impl Into<RelativeOffset>,
        due_offset: impl Into<RelativeOffset>,
        after_position: Option<usize>,
    ) -> Result<&mut MilestoneNode, TemplateError> {
        let id = self.allocate_id()?;
        let index = insertion_index(self.milestones.len(), after_position);
        self.milestones.insert(
            index,
            MilestoneNode {
                id,
                name: name.into(),
                description: None,
                position: index,
                start_offset: start_offset.into(),
                due_offset: due_offset.into(),
                tasks: Vec::new(),
            },
        );
        self.reindex_milestones();
        Ok(&mut self.milestones[index])
    }

    /// Removes the milestone together with every task it owns.
    pub fn remove_milestone(&mut self, id: MilestoneId) -> Result<MilestoneNode, TemplateError> {
        let index = self
            .milestones
            .iter()
            .position(|m| m.id == id)
            .ok_or(TemplateError::MilestoneNotFound(id))?;
        let removed = self.milestones.remove(index);
        self.reindex_milestones();
        Ok(removed)
    }

    /// `new_order` must list every milestone id exactly once. On failure the
    /// graph is left untouched.
    pub fn reorder_milestones(&mut self, new_order: &[MilestoneId]) -> Result<(), TemplateError> {
        let current: Vec<MilestoneId> = self.milestones.iter().map(|m| m.id).collect();
        check_permutation(&current, new_order)?;

        let mut remaining = std::mem::take(&mut self.milestones);
        for id in new_order {
            if let Some(index) = remaining.iter().position(|m| m.id == *id) {
                self.milestones.push(remaining.swap_remove(index));
            }
        }
        self.reindex_milestones();
        Ok(())
    }

    pub fn set_milestone_offsets(
        &mut self,
        id: MilestoneId,
        start_offset: Option<RelativeOffset>,
        due_offset: Option<RelativeOffset>,
    ) -> Result<(), TemplateError> {
        let milestone = self
            .milestone_mut(id)
            .ok_or(TemplateError::MilestoneNotFound(id))?;
        if let Some(start) = start_offset {
            milestone.start_offset = start;
        }
        if let Some(due) = due_offset {
            milestone.due_offset = due;
        }
        Ok(())
    }

    pub fn add_task(
        &mut self,
        milestone_id: MilestoneId,
        title: impl Into<String>,
        due_offset: impl Into<RelativeOffset>,
        after_position: Option<usize>,
    ) -> Result<&mut TaskNode, TemplateError> {
        if self.milestone(milestone_id).is_none() {
            return Err(TemplateError::MilestoneNotFound(milestone_id));
        }
        let id = self.allocate_id()?;
        let milestone = self
            .milestone_mut(milestone_id)
            .ok_or(TemplateError::MilestoneNotFound(milestone_id))?;
        let index = insertion_index(milestone.tasks.len(), after_position);
        milestone.tasks.insert(
            index,
            TaskNode {
                id,
                title: title.into(),
                description: None,
                priority: Priority::default(),
                estimated_hours: None,
                position: index,
                due_offset: due_offset.into(),
            },
        );
        reindex_tasks(&mut milestone.tasks);
        Ok(&mut milestone.tasks[index])
    }

    pub fn remove_task(
        &mut self,
        milestone_id: MilestoneId,
        task_id: TaskId,
    ) -> Result<TaskNode, TemplateError> {
        let milestone = self
            .milestone_mut(milestone_id)
            .ok_or(TemplateError::MilestoneNotFound(milestone_id))?;
        let index = milestone
            .tasks
            .iter()
            .position(|t| t.id == task_id)
            .ok_or(TemplateError::TaskNotFound {
                milestone: milestone_id,
                task: task_id,
            })?;
        let removed = milestone.tasks.remove(index);
        reindex_tasks(&mut milestone.tasks);
        Ok(removed)
    }

    pub fn reorder_tasks(
        &mut self,
        milestone_id: MilestoneId,
        new_order: &[TaskId],
    ) -> Result<(), TemplateError> {
        let milestone = self
            .milestone_mut(milestone_id)
            .ok_or(TemplateError::MilestoneNotFound(milestone_id))?;
        let current: Vec<TaskId> = milestone.tasks.iter().map(|t| t.id).collect();
        check_permutation(&current, new_order)?;

        let mut remaining = std::mem::take(&mut milestone.tasks);
        for id in new_order {
            if let Some(index) = remaining.iter().position(|t| t.id == *id) {
                milestone.tasks.push(remaining.swap_remove(index));
            }
        }
        reindex_tasks(&mut milestone.tasks);
        Ok(())
    }

    pub fn set_task_due_offset(
        &mut self,
        milestone_id: MilestoneId,
        task_id: TaskId,
        due_offset: impl Into<RelativeOffset>,
    ) -> Result<(), TemplateError> {
        let milestone = self
            .milestone_mut(milestone_id)
            .ok_or(TemplateError::MilestoneNotFound(milestone_id))?;
        let task = milestone
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or(TemplateError::TaskNotFound {
                milestone: milestone_id,
                task: task_id,
            })?;
        task.due_offset = due_offset.into();
        Ok(())
    }

    /// Checks a graph that did not come through the mutators (e.g. one read
    /// from disk): ids must be unique and positions must match vector order.
    pub fn validate_structure(&self) -> Result<(), TemplateError> {
        let mut seen = HashSet::new();
        for (expected, milestone) in self.milestones.iter().enumerate() {
            if !seen.insert(milestone.id) {
                return Err(TemplateError::DuplicateId(milestone.id));
            }
            if milestone.position != expected {
                return Err(TemplateError::PositionMismatch {
                    node: NodeRef::Milestone { id: milestone.id },
                    found: milestone.position,
                    expected,
                });
            }
            for (expected, task) in milestone.tasks.iter().enumerate() {
                if !seen.insert(task.id) {
                    return Err(TemplateError::DuplicateId(task.id));
                }
                if task.position != expected {
                    return Err(TemplateError::PositionMismatch {
                        node: NodeRef::Task {
                            milestone_id: milestone.id,
                            id: task.id,
                        },
                        found: task.position,
                        expected,
                    });
                }
            }
        }
        Ok(())
    }

    fn reindex_milestones(&mut self) {
        for (position, milestone) in self.milestones.iter_mut().enumerate() {
            milestone.position = position;
        }
    }
}

fn reindex_tasks(tasks: &mut [TaskNode]) {
    for (position, task) in tasks.iter_mut().enumerate() {
        task.position = position;
    }
}

fn insertion_index(len: usize, after_position: Option<usize>) -> usize {
    match after_position {
        Some(position) => position.saturating_add(1).min(len),
        None => len,
    }
}

fn check_permutation(current: &[u32], proposed: &[u32]) -> Result<(), TemplateError> {
    if proposed.len() != current.len() {
        return Err(TemplateError::InvalidReorder(format!(
            "expected {} ids, got {}",
            current.len(),
            proposed.len()
        )));
    }
    let known: HashSet<u32> = current.iter().copied().collect();
    let mut seen = HashSet::with_capacity(proposed.len());
    for id in proposed {
        if !known.contains(id) {
            return Err(TemplateError::InvalidReorder(format!("unknown id {id}")));
        }
        if !seen.insert(*id) {
            return Err(TemplateError::InvalidReorder(format!("id {id} listed twice")));
        }
    }
    Ok(())
}
