//! Three-valued survey answers.
//!
//! Exit surveys record contributing factors as checkboxes whose cells may be
//! ticked, explicitly unticked or simply left blank. Blank is not the same as
//! "no", so a factor is carried as [`Answer`] until the final imputation step.

/// A resolved sub-reason cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Answer {
    Yes,
    No,
    Unknown,
}

impl Answer {
    /// DETE encoding: boolean text (`True`/`False`), blank is unknown.
    pub fn from_flag(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Answer::Unknown,
            Some(text) if text.eq_ignore_ascii_case("true") => Answer::Yes,
            Some(text) if text.eq_ignore_ascii_case("false") => Answer::No,
            Some(_) => Answer::Unknown,
        }
    }

    /// TAFE encoding: `-` is an explicit no, blank is unknown, any other
    /// text names the factor and counts as yes.
    pub fn from_marker(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Answer::Unknown,
            Some("-") => Answer::No,
            Some(_) => Answer::Yes,
        }
    }

    /// OR-reduce a set of answers: any yes wins, unknowns are skipped, and
    /// the result is only unknown when nothing was answered at all.
    pub fn any<I>(answers: I) -> Self
    where
        I: IntoIterator<Item = Answer>,
    {
        let mut result = Answer::Unknown;
        for answer in answers {
            match answer {
                Answer::Yes => return Answer::Yes,
                Answer::No => result = Answer::No,
                Answer::Unknown => {}
            }
        }
        result
    }

    pub fn to_option(self) -> Option<bool> {
        match self {
            Answer::Yes => Some(true),
            Answer::No => Some(false),
            Answer::Unknown => None,
        }
    }
}

impl From<Option<bool>> for Answer {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Answer::Yes,
            Some(false) => Answer::No,
            None => Answer::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_parsing_keeps_blank_distinct_from_false() {
        assert_eq!(Answer::from_flag(Some("True")), Answer::Yes);
        assert_eq!(Answer::from_flag(Some("FALSE")), Answer::No);
        assert_eq!(Answer::from_flag(Some("  ")), Answer::Unknown);
        assert_eq!(Answer::from_flag(None), Answer::Unknown);
        assert_eq!(Answer::from_flag(Some("maybe")), Answer::Unknown);
    }

    #[test]
    fn marker_parsing_treats_dash_as_no() {
        assert_eq!(Answer::from_marker(Some("-")), Answer::No);
        assert_eq!(Answer::from_marker(None), Answer::Unknown);
        assert_eq!(
            Answer::from_marker(Some("Contributing Factors. Dissatisfaction")),
            Answer::Yes
        );
    }

    #[test]
    fn any_is_true_when_one_factor_is_true() {
        let answers = [Answer::No, Answer::Unknown, Answer::Yes, Answer::No];
        assert_eq!(Answer::any(answers), Answer::Yes);
    }

    #[test]
    fn any_is_false_when_answered_factors_are_all_false() {
        assert_eq!(Answer::any([Answer::No, Answer::No]), Answer::No);
        assert_eq!(Answer::any([Answer::No, Answer::Unknown]), Answer::No);
    }

    #[test]
    fn any_is_unknown_only_when_every_factor_is_unknown() {
        assert_eq!(
            Answer::any([Answer::Unknown, Answer::Unknown]),
            Answer::Unknown
        );
        assert_eq!(Answer::any(std::iter::empty()), Answer::Unknown);
    }

    #[test]
    fn any_matches_exhaustive_truth_table() {
        let states = [Answer::Yes, Answer::No, Answer::Unknown];
        for a in states {
            for b in states {
                for c in states {
                    let result = Answer::any([a, b, c]);
                    let inputs = [a, b, c];
                    if inputs.contains(&Answer::Yes) {
                        assert_eq!(result, Answer::Yes);
                    } else if inputs.iter().all(|x| *x == Answer::Unknown) {
                        assert_eq!(result, Answer::Unknown);
                    } else {
                        assert_eq!(result, Answer::No);
                    }
                }
            }
        }
    }
}
