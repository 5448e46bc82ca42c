//! WASM bindings for pivotal
//!
//! JavaScript-friendly entry points for the browser front end.

use wasm_bindgen::prelude::*;

use crate::parser::Parser;
use crate::scenario::Scenario;
use pivotal_solver::Solver;

fn to_js_error(message: impl ToString) -> JsValue {
    js_sys::Error::new(&message.to_string()).into()
}

/// Parse a linear expression and return its terms as JSON
#[wasm_bindgen(js_name = parseExpression)]
pub fn parse_expression(source: &str) -> Result<JsValue, JsValue> {
    let terms = Parser::terms(source).map_err(to_js_error)?;
    serde_wasm_bindgen::to_value(&terms).map_err(to_js_error)
}

/// Parse a linear expression into a `{ variable: coefficient }` object
#[wasm_bindgen]
pub fn coefficients(source: &str) -> Result<JsValue, JsValue> {
    let coefficients = Parser::parse(source).map_err(to_js_error)?;
    serde_wasm_bindgen::to_value(&coefficients).map_err(to_js_error)
}

/// Solve a scenario object and return the full report
///
/// `scenario` has the saved-problem shape: `objectiveName`,
/// `objectiveFunction`, `optimizationType` and `constraints`.
#[wasm_bindgen]
pub fn solve(scenario: JsValue) -> Result<JsValue, JsValue> {
    let scenario: Scenario = serde_wasm_bindgen::from_value(scenario).map_err(to_js_error)?;
    let report = scenario.solve(&Solver::new()).map_err(to_js_error)?;
    serde_wasm_bindgen::to_value(&report).map_err(to_js_error)
}

/// Render every tableau of a scenario's solve as text
#[wasm_bindgen(js_name = renderTableaux)]
pub fn render_tableaux(scenario: JsValue) -> Result<Vec<String>, JsValue> {
    let scenario: Scenario = serde_wasm_bindgen::from_value(scenario).map_err(to_js_error)?;
    let report = scenario.solve(&Solver::new()).map_err(to_js_error)?;
    Ok(report
        .solution
        .tableau_history
        .iter()
        .map(|tableau| tableau.to_string())
        .collect())
}
