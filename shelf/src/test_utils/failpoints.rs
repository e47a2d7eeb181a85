use fail::FailScenario;

/// Configures fail points for the lifetime of the guard and switches them off on drop.
pub struct FailPointGuard<'a> {
    _scenario: FailScenario<'a>,
    names: Vec<String>,
}

impl<'a> FailPointGuard<'a> {
    /// Applies each `(name, action)` pair, for example `("open_loan.before_record", "return")`.
    pub fn setup(failpoints: &[(&str, &str)]) -> FailPointGuard<'a> {
        let scenario = FailScenario::setup();
        let mut names = Vec::with_capacity(failpoints.len());

        for (name, action) in failpoints {
            fail::cfg(*name, action).unwrap();
            names.push(name.to_string());
        }

        Self {
            _scenario: scenario,
            names,
        }
    }
}

impl Drop for FailPointGuard<'_> {
    fn drop(&mut self) {
        for name in &self.names {
            fail::remove(name);
        }
    }
}
