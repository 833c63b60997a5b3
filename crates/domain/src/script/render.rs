//! Text rendering of a compiled [`Script`](super::Script).
//!
//! The executor runs JavaScript with the signing primitives exposed under
//! `Lit.Actions`. Rendering is the only place that knows this dialect.

use super::{Driver, ScriptUnit, UnitBody};
use crate::action::Comparison;
use crate::transaction::SIGNER_ADDRESS_PLACEHOLDER;

/// Primitive a script calls to report its output.
pub const REPORT_RESULT_CALL: &str = "Lit.Actions.setResponse";
/// Primitive a script calls to request a signature.
pub const SIGN_CALL: &str = "Lit.Actions.signEcdsa";
/// Name of the map every unit writes its result into.
pub const RESULTS_VAR: &str = "results";
/// Name of the executor parameter carrying fetch API keys, keyed by unit name.
pub const API_KEYS_PARAM: &str = "apiKeys";

const DRIVER_NAME: &str = "go";

/// Shared helpers, emitted once at the top of every script.
pub(super) fn prelude() -> String {
    let arms: String = Comparison::ALL
        .into_iter()
        .map(|operator| {
            format!(
                "    case {}: return {};\n",
                js_string(operator.symbol()),
                compare_arm(operator)
            )
        })
        .collect();
    format!(
        r#"const {RESULTS_VAR} = {{}};
const signerAddress = ethers.utils.computeAddress(publicKey);
const hashTransaction = (tx) => {{
  const {{ from, ...fields }} = tx;
  return ethers.utils.arrayify(
    ethers.utils.keccak256(ethers.utils.arrayify(ethers.utils.serializeTransaction(fields))),
  );
}};
const extractPath = (body, path) =>
  path.split(".").reduce((node, key) => {{
    if (node === null || typeof node !== "object" || !(key in node)) {{
      throw new Error(`missing key "${{key}}" in response path "${{path}}"`);
    }}
    return node[key];
  }}, body);
const sameKind = (left, right) =>
  typeof left === typeof right && ["number", "string", "boolean"].includes(typeof left);
const equal = (left, right) =>
  sameKind(left, right) ? left === right : JSON.stringify(left) === JSON.stringify(right);
const compare = (left, operator, right) => {{
  switch (operator) {{
{arms}    default: throw new Error(`unknown operator ${{operator}}`);
  }}
}};
const checkSignCondition = (value, conditions) =>
  conditions.reduce(
    (acc, c) => (c.type === "&&" ? acc && compare(value, c.operator, c.value) : acc || compare(value, c.operator, c.value)),
    conditions.length > 0 && conditions[0].type === "&&",
  );
"#
    )
}

/// Render one named unit as an async function.
pub(super) fn unit(unit: &ScriptUnit) -> String {
    let name = &unit.name;
    let body = match &unit.body {
        UnitBody::Custom { code } => format!("{code}\n"),
        UnitBody::Fetch {
            url,
            authenticated,
            response_path,
            sign_condition,
            to_sign,
        } => {
            let headers = if *authenticated {
                format!(
                    ", {{ headers: {{ Authorization: `Bearer ${{{API_KEYS_PARAM}[{name:?}]}}` }} }}"
                )
            } else {
                String::new()
            };
            format!(
                r#"  try {{
    const response = await fetch({url}{headers});
    const body = await response.json();
    const value = extractPath(body, {response_path});
    const signed = checkSignCondition(value, {conditions});
    if (signed) {{
      await {SIGN_CALL}({{ toSign: new Uint8Array({to_sign}), publicKey, sigName: {name:?} }});
    }}
    {RESULTS_VAR}[{name:?}] = {{ value, signed }};
  }} catch (err) {{
    console.log(`{name}: ${{err.message}}`);
  }}
"#,
                url = js_string(url),
                response_path = js_string(response_path),
                conditions = json(sign_condition),
                to_sign = json(to_sign),
            )
        }
        UnitBody::Contract { transaction } => {
            let tx = json(transaction).replace(
                &format!("\"from\":\"{SIGNER_ADDRESS_PLACEHOLDER}\""),
                "\"from\":signerAddress",
            );
            format!(
                r"  const tx = {tx};
  await {SIGN_CALL}({{ toSign: hashTransaction(tx), publicKey, sigName: {name:?} }});
  {RESULTS_VAR}[{name:?}] = tx;
"
            )
        }
    };
    format!("const {name} = async () => {{\n{body}}};\n")
}

/// Render the driver that runs every unit and reports the result map.
pub(super) fn driver(driver: &Driver) -> String {
    let calls = driver
        .units
        .iter()
        .map(|name| format!("{name}()"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "const {DRIVER_NAME} = async () => {{\n  await Promise.all([{calls}]);\n  {REPORT_RESULT_CALL}({{ response: JSON.stringify({RESULTS_VAR}) }});\n}};\n{DRIVER_NAME}();\n"
    )
}

/// JavaScript expression deciding `left <operator> right` in the prelude's
/// `compare`, with the same typed rules as [`SignCondition::holds`].
///
/// [`SignCondition::holds`]: crate::action::SignCondition::holds
fn compare_arm(operator: Comparison) -> &'static str {
    match operator {
        Comparison::Lt => "sameKind(left, right) && left < right",
        Comparison::Gt => "sameKind(left, right) && left > right",
        Comparison::Le => "sameKind(left, right) && left <= right",
        Comparison::Ge => "sameKind(left, right) && left >= right",
        Comparison::Eq | Comparison::StrictEq => "equal(left, right)",
        Comparison::Ne | Comparison::StrictNe => "!equal(left, right)",
    }
}

fn js_string(value: &str) -> String {
    json(value)
}

fn json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionKind, Joiner, SignCondition};
    use serde_json::json;

    fn fetch_unit() -> ScriptUnit {
        ScriptUnit {
            name: "fetch1".to_string(),
            kind: ActionKind::Fetch,
            priority: 1,
            body: UnitBody::Fetch {
                url: "https://api.example.com/price".to_string(),
                authenticated: false,
                response_path: "data.price".to_string(),
                sign_condition: vec![SignCondition::new(Joiner::And, Comparison::Gt, 5)],
                to_sign: vec![1, 2, 3],
            },
        }
    }

    #[test]
    fn should_emit_one_compare_arm_per_operator() {
        let prelude = prelude();
        for operator in Comparison::ALL {
            let arm = format!(
                "case {}: return {};",
                js_string(operator.symbol()),
                compare_arm(operator)
            );
            assert_eq!(prelude.matches(&arm).count(), 1, "{arm}");
        }
        assert!(!prelude.contains("left == right"));
        assert!(!prelude.contains("left != right"));
    }

    #[test]
    fn should_guard_ordering_when_operand_kinds_differ() {
        for operator in Comparison::ALL {
            let arm = compare_arm(operator);
            if operator.is_ordering() {
                assert!(arm.starts_with("sameKind(left, right) && "), "{arm}");
                // Rust side refuses the same mixed-kind ordering.
                let condition = SignCondition::new(Joiner::And, operator, 3);
                assert!(!condition.holds(&json!("2")));
            } else {
                assert!(arm.contains("equal(left, right)"), "{arm}");
            }
        }
    }

    #[test]
    fn should_abort_fetch_unit_before_recording_when_path_missing() {
        let text = unit(&fetch_unit());
        let try_at = text.find("try {").unwrap();
        let extract_at = text.find("extractPath(body, \"data.price\")").unwrap();
        let sign_at = text.find(SIGN_CALL).unwrap();
        let record_at = text.find("results[\"fetch1\"] = { value, signed }").unwrap();
        let catch_at = text.find("} catch (err) {").unwrap();

        assert!(try_at < extract_at);
        assert!(extract_at < sign_at);
        assert!(sign_at < record_at);
        assert!(record_at < catch_at);
        // The catch branch only logs; nothing is recorded for the unit.
        assert!(!text[catch_at..].contains(RESULTS_VAR));
        assert!(prelude().contains("throw new Error(`missing key"));
    }

    #[test]
    fn should_close_custom_unit_after_its_code() {
        let text = unit(&ScriptUnit {
            name: "custom1".to_string(),
            kind: ActionKind::Custom,
            priority: 1,
            body: UnitBody::Custom {
                code: "  doWork();".to_string(),
            },
        });
        assert_eq!(text, "const custom1 = async () => {\n  doWork();\n};\n");
    }
}
