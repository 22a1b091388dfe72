use crate::config::ExpansionConfig;
use crate::expander::{ExpandedSchedule, ExpansionError, OffsetField, ScheduleExpander};
use crate::template::{NodeRef, TemplateGraph};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;

/// Live preview for an editing session.
///
/// Holds no state between calls and never logs: a mid-edit graph with a bad
/// offset is an ordinary `Err`, meaning "not ready to preview yet".
#[derive(Debug, Clone, Default)]
pub struct PreviewService {
    expander: ScheduleExpander,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewStatus {
    Ready(ExpandedSchedule),
    NotReady(ExpansionError),
}

impl From<Result<ExpandedSchedule, ExpansionError>> for PreviewStatus {
    fn from(result: Result<ExpandedSchedule, ExpansionError>) -> Self {
        match result {
            Ok(schedule) => PreviewStatus::Ready(schedule),
            Err(err) => PreviewStatus::NotReady(err),
        }
    }
}

impl PreviewStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, PreviewStatus::Ready(_))
    }
}

/// One field-level problem, shaped for display next to the offending input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub node: NodeRef,
    pub field: OffsetField,
    pub message: String,
}

impl From<&ExpansionError> for FieldIssue {
    fn from(err: &ExpansionError) -> Self {
        let message = match err.offset_error() {
            Some(source) => source.to_string(),
            None => err.to_string(),
        };
        Self {
            node: err.node(),
            field: err.field(),
            message,
        }
    }
}

impl PreviewService {
    pub fn new(config: ExpansionConfig) -> Self {
        Self {
            expander: ScheduleExpander::new(config),
        }
    }

    pub fn config(&self) -> &ExpansionConfig {
        self.expander.config()
    }

    pub fn preview(
        &self,
        graph: &TemplateGraph,
        candidate_anchor: NaiveDate,
    ) -> Result<ExpandedSchedule, ExpansionError> {
        self.expander.expand(graph, candidate_anchor)
    }

    pub fn status(&self, graph: &TemplateGraph, candidate_anchor: NaiveDate) -> PreviewStatus {
        self.preview(graph, candidate_anchor).into()
    }

    /// Independent previews for several candidate anchors, in input order.
    pub fn preview_anchors(
        &self,
        graph: &TemplateGraph,
        anchors: &[NaiveDate],
    ) -> Vec<(NaiveDate, Result<ExpandedSchedule, ExpansionError>)> {
        anchors
            .par_iter()
            .map(|anchor| (*anchor, self.preview(graph, *anchor)))
            .collect()
    }

    /// Every invalid offset field in the graph, not just the first.
    pub fn field_issues(&self, graph: &TemplateGraph) -> Vec<FieldIssue> {
        self.expander
            .offset_errors(graph)
            .iter()
            .map(FieldIssue::from)
            .collect()
    }
}

pub fn preview(
    graph: &TemplateGraph,
    candidate_anchor: NaiveDate,
) -> Result<ExpandedSchedule, ExpansionError> {
    PreviewService::default().preview(graph, candidate_anchor)
}
