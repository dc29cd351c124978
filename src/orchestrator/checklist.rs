use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Active,
    Completed,
}

/// The four fixed stages of a search, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Analyze,
    Generate,
    Search,
    Collage,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Analyze, Stage::Generate, Stage::Search, Stage::Collage];

    fn index(self) -> usize {
        match self {
            Stage::Analyze => 0,
            Stage::Generate => 1,
            Stage::Search => 2,
            Stage::Collage => 3,
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Stage::Analyze => "1",
            Stage::Generate => "2",
            Stage::Search => "3",
            Stage::Collage => "4",
        }
    }

    pub fn default_label(self) -> &'static str {
        match self {
            Stage::Analyze => "Analyzing query",
            Stage::Generate => "Generating reference search terms",
            Stage::Search => "Searching web for images (per term)",
            Stage::Collage => "Building reference collage",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub label: String,
    pub status: StageStatus,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChecklistError {
    #[error("Stage {stage:?} cannot start: it is {status:?}")]
    NotPending { stage: Stage, status: StageStatus },

    #[error("Stage {stage:?} cannot start before {blocker:?} completes")]
    OutOfOrder { stage: Stage, blocker: Stage },

    #[error("Stage {0:?} cannot complete: it is not active")]
    NotActive(Stage),
}

/// Progress over the four stages. Stages move `pending -> active -> completed`
/// strictly in order, with at most one active at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checklist {
    items: Vec<ChecklistItem>,
    model: Option<String>,
}

impl Checklist {
    pub fn new() -> Self {
        Self::for_model(None)
    }

    /// Names `model` in the first stage label, e.g. "Analyzing query with gpt-5".
    pub fn for_model(model: Option<&str>) -> Self {
        let items = Stage::ALL
            .iter()
            .map(|stage| {
                let label = match (stage, model) {
                    (Stage::Analyze, Some(model)) => {
                        format!("{} with {}", stage.default_label(), model)
                    }
                    _ => stage.default_label().to_string(),
                };
                ChecklistItem {
                    id: stage.id().to_string(),
                    label,
                    status: StageStatus::Pending,
                }
            })
            .collect();

        Self {
            items,
            model: model.map(str::to_string),
        }
    }

    pub fn items(&self) -> &[ChecklistItem] {
        &self.items
    }

    pub fn status(&self, stage: Stage) -> StageStatus {
        self.items[stage.index()].status
    }

    pub fn start(&mut self, stage: Stage) -> Result<(), ChecklistError> {
        let status = self.status(stage);
        if status != StageStatus::Pending {
            return Err(ChecklistError::NotPending { stage, status });
        }
        if let Some(blocker) = Stage::ALL[..stage.index()]
            .iter()
            .find(|s| self.status(**s) != StageStatus::Completed)
        {
            return Err(ChecklistError::OutOfOrder {
                stage,
                blocker: *blocker,
            });
        }

        self.items[stage.index()].status = StageStatus::Active;
        Ok(())
    }

    /// Completes the active `stage`, optionally replacing its label.
    pub fn complete(&mut self, stage: Stage, label: Option<String>) -> Result<(), ChecklistError> {
        if self.status(stage) != StageStatus::Active {
            return Err(ChecklistError::NotActive(stage));
        }

        let item = &mut self.items[stage.index()];
        item.status = StageStatus::Completed;
        if let Some(label) = label {
            item.label = label;
        }
        Ok(())
    }

    /// Back to all-pending with the original labels.
    pub fn reset(&mut self) {
        *self = Self::for_model(self.model.as_deref());
    }
}

impl Default for Checklist {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_sequence() {
        let mut checklist = Checklist::new();
        for stage in Stage::ALL {
            checklist.start(stage).unwrap();
            assert_eq!(checklist.status(stage), StageStatus::Active);
            checklist.complete(stage, None).unwrap();
        }
        assert!(checklist
            .items()
            .iter()
            .all(|item| item.status == StageStatus::Completed));
    }

    #[test]
    fn test_no_skipping() {
        let mut checklist = Checklist::new();
        let err = checklist.start(Stage::Search).unwrap_err();
        assert_eq!(
            err,
            ChecklistError::OutOfOrder {
                stage: Stage::Search,
                blocker: Stage::Analyze
            }
        );
    }

    #[test]
    fn test_one_active_at_a_time() {
        let mut checklist = Checklist::new();
        checklist.start(Stage::Analyze).unwrap();
        assert!(checklist.start(Stage::Generate).is_err());
    }

    #[test]
    fn test_no_backward_transitions() {
        let mut checklist = Checklist::new();
        checklist.start(Stage::Analyze).unwrap();
        checklist.complete(Stage::Analyze, None).unwrap();
        assert!(matches!(
            checklist.start(Stage::Analyze),
            Err(ChecklistError::NotPending { .. })
        ));
        assert_eq!(
            checklist.complete(Stage::Analyze, None),
            Err(ChecklistError::NotActive(Stage::Analyze))
        );
    }

    #[test]
    fn test_complete_with_label_and_reset() {
        let mut checklist = Checklist::new();
        checklist.start(Stage::Analyze).unwrap();
        checklist
            .complete(Stage::Analyze, Some("Analyzed".to_string()))
            .unwrap();
        assert_eq!(checklist.items()[0].label, "Analyzed");

        checklist.reset();
        assert_eq!(checklist, Checklist::new());
        assert!(checklist
            .items()
            .iter()
            .all(|item| item.status == StageStatus::Pending));
    }

    #[test]
    fn test_model_named_in_first_label_and_kept_on_reset() {
        let mut checklist = Checklist::for_model(Some("gpt-5"));
        assert_eq!(checklist.items()[0].label, "Analyzing query with gpt-5");
        assert_eq!(checklist.items()[1].label, "Generating reference search terms");

        checklist.start(Stage::Analyze).unwrap();
        checklist
            .complete(Stage::Analyze, Some("Analyzed".to_string()))
            .unwrap();
        checklist.reset();
        assert_eq!(checklist, Checklist::for_model(Some("gpt-5")));
        assert_eq!(Checklist::new().items()[0].label, "Analyzing query");
    }
}
