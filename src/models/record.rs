use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::core::{InvoiceError, InvoiceResult};

pub const DEFAULT_TEMPLATE: &str = "simple";

/// The seven named data slots of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Company,
    Head,
    BillTo,
    ShipTo,
    Items,
    Totals,
    Notes,
}

impl Slot {
    pub const ALL: [Slot; 7] = [
        Slot::Company,
        Slot::Head,
        Slot::BillTo,
        Slot::ShipTo,
        Slot::Items,
        Slot::Totals,
        Slot::Notes,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Slot::Company => "company",
            Slot::Head => "head",
            Slot::BillTo => "billto",
            Slot::ShipTo => "shipto",
            Slot::Items => "items",
            Slot::Totals => "totals",
            Slot::Notes => "notes",
        }
    }

    /// Text slots hold plain lines; the others hold structured entries the
    /// templates interpret.
    pub fn is_text(&self) -> bool {
        !matches!(self, Slot::Items | Slot::Totals)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Slot {
    type Err = InvoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Slot::ALL
            .into_iter()
            .find(|slot| slot.name() == s)
            .ok_or_else(|| InvoiceError::InvalidSlot(s.to_string()))
    }
}

/// Which template renders the invoice, and how its identifier is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSelection {
    pub identifier: String,
    /// Look the identifier up under the built-in per-format roots. When
    /// false the identifier is used as a literal path (PDF/DOCX only).
    pub vendor: bool,
}

impl Default for TemplateSelection {
    fn default() -> Self {
        TemplateSelection {
            identifier: DEFAULT_TEMPLATE.to_string(),
            vendor: true,
        }
    }
}

/// A single invoice being built up for rendering.
///
/// `company` keeps fixed positions: logo URL (HTML), logo file path
/// (PDF/DOCX), name, address, contact line, website, email. `head` is
/// invoice number, issue date, due date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceRecord {
    company: Vec<String>,
    head: Vec<String>,
    billto: Vec<String>,
    shipto: Vec<String>,
    items: Vec<Value>,
    totals: Vec<Value>,
    notes: Vec<String>,
    template: TemplateSelection,
    #[serde(skip)]
    rendered: Option<String>,
}

impl InvoiceRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` to the named slot.
    pub fn add(&mut self, slot: &str, value: impl Into<Value>) -> InvoiceResult<()> {
        let slot: Slot = slot.parse()?;
        let value = value.into();

        match slot {
            Slot::Items => self.items.push(value),
            Slot::Totals => self.totals.push(value),
            _ => {
                let line = text_entry(slot, value)?;
                if let Some(lines) = self.lines_mut(slot) {
                    lines.push(line);
                }
            }
        }
        Ok(())
    }

    /// Replaces the named slot wholesale. `value` must be a sequence.
    pub fn set(&mut self, slot: &str, value: impl Into<Value>) -> InvoiceResult<()> {
        let slot: Slot = slot.parse()?;
        let entries = match value.into() {
            Value::Array(entries) => entries,
            _ => {
                return Err(InvoiceError::SlotMismatch {
                    slot,
                    expected: "a sequence",
                })
            }
        };

        match slot {
            Slot::Items => self.items = entries,
            Slot::Totals => self.totals = entries,
            _ => {
                let lines = entries
                    .into_iter()
                    .map(|entry| text_entry(slot, entry))
                    .collect::<InvoiceResult<Vec<_>>>()?;
                if let Some(slot_lines) = self.lines_mut(slot) {
                    *slot_lines = lines;
                }
            }
        }
        Ok(())
    }

    /// Current value of the named slot as a JSON sequence.
    pub fn get(&self, slot: &str) -> InvoiceResult<Value> {
        let slot: Slot = slot.parse()?;
        Ok(match slot {
            Slot::Items => Value::Array(self.items.clone()),
            Slot::Totals => Value::Array(self.totals.clone()),
            _ => Value::from(self.lines(slot).to_vec()),
        })
    }

    /// Empties every slot and restores the default template selection.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn use_template(&mut self, identifier: impl Into<String>, vendor: bool) {
        self.template = TemplateSelection {
            identifier: identifier.into(),
            vendor,
        };
    }

    pub fn template(&self) -> &TemplateSelection {
        &self.template
    }

    pub fn company(&self) -> &[String] {
        &self.company
    }

    pub fn head(&self) -> &[String] {
        &self.head
    }

    pub fn billto(&self) -> &[String] {
        &self.billto
    }

    pub fn shipto(&self) -> &[String] {
        &self.shipto
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn totals(&self) -> &[Value] {
        &self.totals
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// Output of the most recent render, kept until the next render or reset.
    pub fn rendered(&self) -> Option<&str> {
        self.rendered.as_deref()
    }

    pub(crate) fn set_rendered(&mut self, content: Option<String>) {
        self.rendered = content;
    }

    fn lines(&self, slot: Slot) -> &[String] {
        match slot {
            Slot::Company => &self.company,
            Slot::Head => &self.head,
            Slot::BillTo => &self.billto,
            Slot::ShipTo => &self.shipto,
            Slot::Notes => &self.notes,
            Slot::Items | Slot::Totals => &[],
        }
    }

    fn lines_mut(&mut self, slot: Slot) -> Option<&mut Vec<String>> {
        match slot {
            Slot::Company => Some(&mut self.company),
            Slot::Head => Some(&mut self.head),
            Slot::BillTo => Some(&mut self.billto),
            Slot::ShipTo => Some(&mut self.shipto),
            Slot::Notes => Some(&mut self.notes),
            Slot::Items | Slot::Totals => None,
        }
    }
}

fn text_entry(slot: Slot, value: Value) -> InvoiceResult<String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(InvoiceError::SlotMismatch {
            slot,
            expected: "text entries",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_value(slot: Slot) -> Value {
        if slot.is_text() {
            json!(["first", "second"])
        } else {
            json!([{ "label": "Sub-total", "amount": "$10.00" }, { "label": "Total", "amount": "$11.00" }])
        }
    }

    #[test]
    fn set_then_get_returns_same_value() {
        let mut record = InvoiceRecord::new();
        for slot in Slot::ALL {
            let value = sample_value(slot);
            record.set(slot.name(), value.clone()).unwrap();
            assert_eq!(record.get(slot.name()).unwrap(), value, "slot {}", slot);
        }
    }

    #[test]
    fn add_appends_in_call_order() {
        let mut record = InvoiceRecord::new();
        for slot in Slot::ALL {
            for n in 0..3 {
                let value = if slot.is_text() {
                    json!(format!("line {}", n))
                } else {
                    json!({ "n": n })
                };
                record.add(slot.name(), value).unwrap();
            }
            let got = record.get(slot.name()).unwrap();
            let got = got.as_array().unwrap();
            assert_eq!(got.len(), 3);
            if slot.is_text() {
                assert_eq!(got[0], json!("line 0"));
                assert_eq!(got[2], json!("line 2"));
            } else {
                assert_eq!(got[1], json!({ "n": 1 }));
            }
        }
    }

    #[test]
    fn reset_clears_slots_and_template() {
        let mut record = InvoiceRecord::new();
        for slot in Slot::ALL {
            record.set(slot.name(), sample_value(slot)).unwrap();
        }
        record.use_template("/srv/custom.jinja", false);
        record.set_rendered(Some("<p>old</p>".to_string()));

        record.reset();

        for slot in Slot::ALL {
            assert_eq!(record.get(slot.name()).unwrap(), json!([]));
        }
        assert_eq!(record.template(), &TemplateSelection::default());
        assert_eq!(record.template().identifier, "simple");
        assert!(record.template().vendor);
        assert!(record.rendered().is_none());
    }

    #[test]
    fn unknown_slot_fails_without_mutation() {
        let mut record = InvoiceRecord::new();
        record.add("head", "INV-001").unwrap();
        let before = record.clone();

        for name in ["header", "Company", "", "template"] {
            assert!(matches!(record.add(name, "x"), Err(InvoiceError::InvalidSlot(n)) if n == name));
            assert!(matches!(record.set(name, json!(["x"])), Err(InvoiceError::InvalidSlot(_))));
            assert!(matches!(record.get(name), Err(InvoiceError::InvalidSlot(_))));
        }
        assert_eq!(record, before);
    }

    #[test]
    fn mismatched_values_leave_slot_untouched() {
        let mut record = InvoiceRecord::new();
        record.set("notes", json!(["keep me"])).unwrap();

        let err = record.set("notes", json!(["ok", { "nested": true }])).unwrap_err();
        assert!(matches!(err, InvoiceError::SlotMismatch { slot: Slot::Notes, .. }));
        assert!(record.set("notes", "not a list").is_err());
        assert!(record.add("billto", json!(["a", "b"])).is_err());

        assert_eq!(record.notes(), ["keep me".to_string()]);
        assert!(record.billto().is_empty());
    }

    #[test]
    fn scalar_text_entries_are_stringified() {
        let mut record = InvoiceRecord::new();
        record.add("notes", 42).unwrap();
        record.add("notes", true).unwrap();
        assert_eq!(record.notes(), ["42".to_string(), "true".to_string()]);
    }

    #[test]
    fn deserializes_partial_json_with_defaults() {
        let record: InvoiceRecord = serde_json::from_value(json!({
            "head": ["INV-001", "2024-01-01", "2024-01-31"],
            "items": [{ "description": "Widget", "qty": 1 }]
        }))
        .unwrap();
        assert_eq!(record.head()[0], "INV-001");
        assert_eq!(record.items().len(), 1);
        assert!(record.company().is_empty());
        assert_eq!(record.template().identifier, DEFAULT_TEMPLATE);
    }
}
