//! # Editor Session
//!
//! Pairs a `RuleFile` with the presentation state of whoever is editing it.
//! The view state lives next to the model, never inside it, so the rule file
//! can be serialized or sent for preview at any point without carrying
//! which panels happen to be open.

use std::collections::BTreeSet;

use crate::error::{PseudoGenError, Result};
use crate::model::{AppendRule, ColumnSpec, Mode, RuleFile};

/// An expandable panel of the editor. Column and rule panels are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Panel {
    Settings,
    Column(usize),
    Rule(usize),
    Reorder,
    Preview,
}

/// Which panels are open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    open: BTreeSet<Panel>,
}

impl ViewState {
    pub fn open(&mut self, panel: Panel) {
        self.open.insert(panel);
    }

    pub fn close(&mut self, panel: Panel) {
        self.open.remove(&panel);
    }

    /// Flip a panel and return whether it is now open.
    pub fn toggle(&mut self, panel: Panel) -> bool {
        if self.open.remove(&panel) {
            false
        } else {
            self.open.insert(panel);
            true
        }
    }

    pub fn is_open(&self, panel: Panel) -> bool {
        self.open.contains(&panel)
    }

    pub fn open_panels(&self) -> impl Iterator<Item = Panel> + '_ {
        self.open.iter().copied()
    }

    /// Drop the panel at `position` and move later panels of the same kind
    /// down by one, so they keep following their item.
    fn remove_shifting(&mut self, position: usize, kind: fn(usize) -> Panel) {
        self.open = std::mem::take(&mut self.open)
            .into_iter()
            .filter_map(|panel| match (panel, kind(0)) {
                (Panel::Column(n), Panel::Column(_)) | (Panel::Rule(n), Panel::Rule(_)) => {
                    if n == position {
                        None
                    } else if n > position {
                        Some(kind(n - 1))
                    } else {
                        Some(panel)
                    }
                }
                _ => Some(panel),
            })
            .collect();
    }
}

/// A column offered by the reorder picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableColumn {
    /// 1-based index used in `[reorder] order`.
    pub index: usize,
    pub name: String,
    /// Added by a `generate` rule rather than declared as a base column.
    pub generated: bool,
}

#[derive(Debug, Clone, Default)]
pub struct EditorSession {
    rule_file: RuleFile,
    view: ViewState,
}

impl EditorSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rule_file(rule_file: RuleFile) -> Self {
        Self {
            rule_file,
            view: ViewState::default(),
        }
    }

    pub fn rule_file(&self) -> &RuleFile {
        &self.rule_file
    }

    pub fn rule_file_mut(&mut self) -> &mut RuleFile {
        &mut self.rule_file
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    pub fn into_rule_file(self) -> RuleFile {
        self.rule_file
    }

    /// Append a blank `str` column drawing from one empty weighted option.
    /// Returns its position.
    pub fn add_column(&mut self) -> usize {
        self.rule_file.columns.push(ColumnSpec::default());
        self.rule_file.columns.len()
    }

    /// Remove the column at `position`.
    ///
    /// References held by other columns, rules and the reorder list are
    /// left as they are; `validate` reports the ones that no longer resolve.
    pub fn remove_column(&mut self, position: usize) -> Option<ColumnSpec> {
        let idx = position.checked_sub(1)?;
        if idx >= self.rule_file.columns.len() {
            return None;
        }
        let removed = self.rule_file.columns.remove(idx);
        self.view.remove_shifting(position, Panel::Column);
        Some(removed)
    }

    /// Append an empty replace rule. Returns its position.
    pub fn add_rule(&mut self) -> usize {
        self.rule_file.append_rules.push(AppendRule::default());
        self.rule_file.append_rules.len()
    }

    pub fn remove_rule(&mut self, position: usize) -> Option<AppendRule> {
        let idx = position.checked_sub(1)?;
        if idx >= self.rule_file.append_rules.len() {
            return None;
        }
        let removed = self.rule_file.append_rules.remove(idx);
        self.view.remove_shifting(position, Panel::Rule);
        Some(removed)
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.rule_file.settings.mode = mode;
    }

    /// Set the record count. Zero is rejected and leaves the model unchanged.
    pub fn set_record_count(&mut self, count: u64) -> Result<()> {
        if count == 0 {
            return Err(PseudoGenError::Other(
                "Number of records must be at least 1".to_string(),
            ));
        }
        self.rule_file.settings.record_count = count;
        Ok(())
    }

    /// Columns the reorder list can refer to: base columns, then columns
    /// added by `generate` rules, numbered in that order.
    pub fn available_columns(&self) -> Vec<AvailableColumn> {
        let base = self
            .rule_file
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| (i, column.name.trim(), false));
        let generated = self
            .rule_file
            .append_rules
            .iter()
            .filter_map(|rule| rule.generated_column())
            .enumerate()
            .map(|(i, name)| (i, name.trim(), true));

        base.chain(generated)
            .enumerate()
            .map(|(idx, (own, name, generated))| AvailableColumn {
                index: idx + 1,
                name: if !name.is_empty() {
                    name.to_string()
                } else if generated {
                    format!("Generated {}", own + 1)
                } else {
                    format!("Column {}", own + 1)
                },
                generated,
            })
            .collect()
    }

    /// Replace the rule file with parsed `rules.ini` text.
    ///
    /// On success every panel is closed, since positions may now refer to
    /// different items. On failure nothing changes.
    pub fn load_str(&mut self, text: &str) -> Result<()> {
        self.rule_file.reload_from_str(text)?;
        self.view = ViewState::default();
        Ok(())
    }

    pub fn to_ini_string(&self) -> String {
        self.rule_file.to_ini_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataSource, GeneratedSource};
    use crate::weights::WeightedOption;

    #[test]
    fn test_add_column_defaults() {
        let mut session = EditorSession::new();
        let position = session.add_column();
        assert_eq!(position, 1);

        let column = &session.rule_file().columns[0];
        assert_eq!(column.data_source(), DataSource::Random);
        assert_eq!(column.dtype.as_str(), "str");
        assert_eq!(
            column.source,
            crate::model::ColumnSource::Random {
                pairs: vec![WeightedOption::blank()]
            }
        );
    }

    #[test]
    fn test_remove_column_shifts_open_panels() {
        let mut session = EditorSession::new();
        for _ in 0..4 {
            session.add_column();
        }
        session.view_mut().open(Panel::Column(2));
        session.view_mut().open(Panel::Column(3));
        session.view_mut().open(Panel::Column(4));
        session.view_mut().open(Panel::Rule(3));
        session.view_mut().open(Panel::Preview);

        assert!(session.remove_column(3).is_some());

        let open: Vec<Panel> = session.view().open_panels().collect();
        assert_eq!(
            open,
            vec![Panel::Column(2), Panel::Column(3), Panel::Rule(3), Panel::Preview]
        );
        assert_eq!(session.rule_file().columns.len(), 3);
        assert!(session.remove_column(0).is_none());
        assert!(session.remove_column(9).is_none());
    }

    #[test]
    fn test_view_state_is_not_serialized() {
        let mut session = EditorSession::new();
        session.add_column();
        session.view_mut().open(Panel::Column(1));
        let text = session.to_ini_string();
        assert!(!text.to_lowercase().contains("panel"));
        assert!(!text.contains("open"));
    }

    #[test]
    fn test_rule_removal_and_toggle() {
        let mut session = EditorSession::new();
        session.add_rule();
        session.add_rule();
        assert!(session.view_mut().toggle(Panel::Rule(2)));
        session.remove_rule(1);
        assert!(session.view().is_open(Panel::Rule(1)));
        assert!(!session.view_mut().toggle(Panel::Rule(1)));
    }

    #[test]
    fn test_record_count_rejects_zero() {
        let mut session = EditorSession::new();
        assert!(session.set_record_count(0).is_err());
        assert_eq!(session.rule_file().settings.record_count, 100);
        session.set_record_count(5000).unwrap();
        assert_eq!(session.rule_file().settings.record_count, 5000);
    }

    #[test]
    fn test_available_columns_lists_generated_after_base() {
        let mut session = EditorSession::new();
        session.add_column();
        session.rule_file_mut().columns[0].name = "color".to_string();
        session.add_column();
        session.rule_file_mut().append_rules.push(AppendRule::generate(
            "region",
            GeneratedSource::Faker {
                method: "country".to_string(),
            },
            0.0,
        ));
        session
            .rule_file_mut()
            .append_rules
            .push(AppendRule::replace(1, "a", "b"));

        let available = session.available_columns();
        let labels: Vec<(usize, &str, bool)> = available
            .iter()
            .map(|c| (c.index, c.name.as_str(), c.generated))
            .collect();
        assert_eq!(
            labels,
            vec![(1, "color", false), (2, "Column 2", false), (3, "region", true)]
        );
    }

    #[test]
    fn test_load_str_failure_keeps_model_and_view() {
        let mut session = EditorSession::new();
        session.add_column();
        session.view_mut().open(Panel::Column(1));
        let before = session.rule_file().clone();

        assert!(session.load_str("[rec]\nmode = seven\n").is_err());
        assert_eq!(session.rule_file(), &before);
        assert!(session.view().is_open(Panel::Column(1)));

        session
            .load_str("[rec]\nnum = 5\nmode = 2\n\n[c1]\nname = id\ndata = company\n")
            .unwrap();
        assert_eq!(session.rule_file().settings.record_count, 5);
        assert_eq!(session.view().open_panels().count(), 0);
        session.set_mode(Mode::FullWithReorder);
        assert!(session.rule_file().settings.mode.allows_reorder());
    }
}
