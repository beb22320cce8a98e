//! Parameter form submitted by a front end.
//!
//! Every field is optional; absent fields fall back to the documented defaults of [`Parameters`].

use crate::model::Parameters;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Enumeration of the errors raised while reading a form.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    #[error("Field {field} is not a number: {value:?}.")]
    Unparsable { field: &'static str, value: String },
    #[error("Field {field} must be finite, got {value}.")]
    NonFinite { field: &'static str, value: f64 },
}

/// Raw form values, one optional field per model parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterForm {
    #[serde(rename = "rC")]
    pub r_c: Option<f64>,
    #[serde(rename = "dC")]
    pub d_c: Option<f64>,
    #[serde(rename = "rH")]
    pub r_h: Option<f64>,
    #[serde(rename = "kIL")]
    pub k_il: Option<f64>,
    #[serde(rename = "kCT")]
    pub k_ct: Option<f64>,
    pub s: Option<f64>,
    #[serde(rename = "K")]
    pub k: Option<f64>,
}

impl ParameterForm {
    /// Names of the recognised fields.
    pub const FIELDS: [&'static str; 7] = ["rC", "dC", "rH", "kIL", "kCT", "s", "K"];

    /// Reads `(key, value)` string pairs, as found in a submitted form or on a command line.
    ///
    /// Unknown keys are ignored and empty values count as absent. A later pair overrides an
    /// earlier one with the same key.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, FormError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut form = Self::default();
        for (key, value) in pairs {
            let (field, slot) = match form.slot(key.as_ref()) {
                Some(found) => found,
                None => continue,
            };
            let value = value.as_ref().trim();
            if value.is_empty() {
                *slot = None;
                continue;
            }
            let parsed = value.parse::<f64>().map_err(|_| FormError::Unparsable {
                field,
                value: value.to_string(),
            })?;
            *slot = Some(parsed);
        }
        Ok(form)
    }

    fn slot(&mut self, key: &str) -> Option<(&'static str, &mut Option<f64>)> {
        match key {
            "rC" => Some(("rC", &mut self.r_c)),
            "dC" => Some(("dC", &mut self.d_c)),
            "rH" => Some(("rH", &mut self.r_h)),
            "kIL" => Some(("kIL", &mut self.k_il)),
            "kCT" => Some(("kCT", &mut self.k_ct)),
            "s" => Some(("s", &mut self.s)),
            "K" => Some(("K", &mut self.k)),
            _ => None,
        }
    }

    /// Fills absent fields with their defaults and checks that every value is finite.
    pub fn into_parameters(self) -> Result<Parameters, FormError> {
        let defaults = Parameters::default();
        let params = Parameters {
            r_c: self.r_c.unwrap_or(defaults.r_c),
            d_c: self.d_c.unwrap_or(defaults.d_c),
            r_h: self.r_h.unwrap_or(defaults.r_h),
            k_il: self.k_il.unwrap_or(defaults.k_il),
            k_ct: self.k_ct.unwrap_or(defaults.k_ct),
            s: self.s.unwrap_or(defaults.s),
            k: self.k.unwrap_or(defaults.k),
        };
        for (field, value) in params.named() {
            if !value.is_finite() {
                return Err(FormError::NonFinite { field, value });
            }
        }
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_form_gives_defaults() {
        let params = ParameterForm::default().into_parameters().unwrap();
        assert_eq!(params, Parameters::default());
    }

    #[test]
    fn pairs_override_defaults() {
        let form = ParameterForm::from_pairs(vec![("rC", "0.2"), ("K", " 500 ")]).unwrap();
        assert_eq!(form.r_c, Some(0.2));
        assert_eq!(form.k, Some(500.0));
        assert_eq!(form.d_c, None);

        let params = form.into_parameters().unwrap();
        assert_eq!(params.r_c, 0.2);
        assert_eq!(params.k, 500.0);
        assert_eq!(params.d_c, 0.05);
    }

    #[test]
    fn unknown_keys_and_empty_values_are_ignored() {
        let form =
            ParameterForm::from_pairs(vec![("submit", "Run"), ("kIL", ""), ("s", "0.02")]).unwrap();
        assert_eq!(
            form,
            ParameterForm {
                s: Some(0.02),
                ..ParameterForm::default()
            }
        );
    }

    #[test]
    fn later_pairs_win() {
        let form = ParameterForm::from_pairs(vec![("kCT", "0.5"), ("kCT", "0.25")]).unwrap();
        assert_eq!(form.k_ct, Some(0.25));
    }

    #[test]
    fn unparsable_value_is_an_error() {
        let err = ParameterForm::from_pairs(vec![("dC", "fast")]).unwrap_err();
        assert_eq!(
            err,
            FormError::Unparsable {
                field: "dC",
                value: "fast".to_string()
            }
        );
    }

    #[test]
    fn errors_name_the_submitted_field() {
        for field in ParameterForm::FIELDS {
            let err = ParameterForm::from_pairs(vec![(field, "x")]).unwrap_err();
            assert_eq!(
                err,
                FormError::Unparsable {
                    field,
                    value: "x".to_string()
                }
            );
        }
    }

    #[test]
    fn non_finite_value_is_an_error() {
        let form = ParameterForm::from_pairs(vec![("rH", "inf")]).unwrap();
        assert_eq!(
            form.into_parameters(),
            Err(FormError::NonFinite {
                field: "rH",
                value: f64::INFINITY
            })
        );
    }

    #[test]
    fn zero_capacity_passes_the_form() {
        let params = ParameterForm::from_pairs(vec![("K", "0")])
            .unwrap()
            .into_parameters()
            .unwrap();
        assert_eq!(params.k, 0.0);
    }
}
