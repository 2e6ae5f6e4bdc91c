use rustpython_parser::{Mode, ast, parse};

use crate::{error::EvalError, function_call::GeneratedCall};

/// Separator used by the dataset for multi-valued parameters.
pub const LIST_SEPARATOR: &str = " | ";

pub fn parse_from_string_to_ast(function_calls: &str) -> Result<Vec<ast::Expr>, EvalError> {
    let parsed = parse(function_calls.trim(), Mode::Expression, "<function_calls>")
        .map_err(|e| EvalError::Parse(format!("invalid syntax: {}", e)))?;
    let ast::Mod::Expression(expr) = parsed else {
        return Err(EvalError::Parse("expected an expression".to_string()));
    };
    match *expr.body {
        ast::Expr::List(list_expr) => Ok(list_expr.elts),
        call @ ast::Expr::Call(_) => Ok(vec![call]),
        other => Err(EvalError::Parse(format!(
            "expected a list of function calls, got {:?}",
            other
        ))),
    }
}

pub fn parse_from_ast_to_calls(function_calls_ast: &[ast::Expr]) -> Result<Vec<GeneratedCall>, EvalError> {
    let mut function_calls = Vec::new();
    for expr in function_calls_ast {
        let ast::Expr::Call(call_expr) = expr else {
            return Err(EvalError::Parse(format!(
                "expected a function call expression, got {:?}",
                expr
            )));
        };
        let ast::Expr::Name(name_expr) = &*call_expr.func else {
            return Err(EvalError::Parse(format!(
                "unsupported function expression: {:?}",
                call_expr.func
            )));
        };
        let func_name = name_expr.id.to_string();
        if !call_expr.args.is_empty() {
            return Err(EvalError::Parse(format!(
                "{} takes keyword arguments only",
                func_name
            )));
        }
        let mut call = GeneratedCall::new(func_name);
        for keyword in &call_expr.keywords {
            let Some(arg_name) = &keyword.arg else {
                return Err(EvalError::Parse(format!(
                    "**kwargs is not supported in a call to {}",
                    call.name
                )));
            };
            let value = ast_expr_to_string(&keyword.value)?;
            call = call.with_param(arg_name.to_string(), value);
        }
        function_calls.push(call);
    }
    Ok(function_calls)
}

/// Parses agent output written as a Python list of keyword calls, such as
/// `[check_price(item_name='avis wind')]`, into generated calls.
pub fn decode_function_list(function_calls: &str) -> Result<Vec<GeneratedCall>, EvalError> {
    let function_calls_ast = parse_from_string_to_ast(function_calls)?;
    parse_from_ast_to_calls(&function_calls_ast)
}

/// Parameter values are compared as text, so every literal is flattened to a
/// string here.
pub fn ast_expr_to_string(expr: &ast::Expr) -> Result<String, EvalError> {
    match expr {
        ast::Expr::Constant(c) => match &c.value {
            ast::Constant::Str(s) => Ok(s.to_string()),
            ast::Constant::Int(i) => Ok(i.to_string()),
            ast::Constant::Float(f) => Ok(f.to_string()),
            ast::Constant::Bool(true) => Ok("True".to_string()),
            ast::Constant::Bool(false) => Ok("False".to_string()),
            ast::Constant::None => Ok(String::new()),
            other => Err(EvalError::Parse(format!("unsupported constant: {:?}", other))),
        },
        ast::Expr::UnaryOp(u) if matches!(u.op, ast::UnaryOp::USub) => match &*u.operand {
            ast::Expr::Constant(c) if matches!(c.value, ast::Constant::Int(_) | ast::Constant::Float(_)) => {
                Ok(format!("-{}", ast_expr_to_string(&u.operand)?))
            }
            other => Err(EvalError::Parse(format!("cannot negate {:?}", other))),
        },
        ast::Expr::List(l) => join_items(&l.elts),
        ast::Expr::Tuple(t) => join_items(&t.elts),
        _ => Err(EvalError::Parse(format!("unsupported parameter value: {:?}", expr))),
    }
}

fn join_items(items: &[ast::Expr]) -> Result<String, EvalError> {
    let items = items
        .iter()
        .map(ast_expr_to_string)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items.join(LIST_SEPARATOR))
}
