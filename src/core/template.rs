//! ST-009: Template facade — compile once, render many.

use super::compiler;
use super::context::Context;
use super::error::{CompileError, RenderError};
use super::program::Program;
use tracing::trace;

/// A compiled template plus its base context.
#[derive(Debug, Clone)]
pub struct Template {
    program: Program,
    base: Context,
}

impl Template {
    /// Compile `source` with an empty base context.
    pub fn new(source: &str) -> Result<Self, CompileError> {
        Self::with_contexts(source, std::iter::empty::<Context>())
    }

    /// Compile `source`; `contexts` merge left to right into the base context.
    pub fn with_contexts<I>(source: &str, contexts: I) -> Result<Self, CompileError>
    where
        I: IntoIterator<Item = Context>,
    {
        let program = compiler::compile(source)?;
        let mut base = Context::new();
        for ctx in contexts {
            base.merge(&ctx);
        }
        Ok(Self { program, base })
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn base_context(&self) -> &Context {
        &self.base
    }

    /// Names the render context must supply (after the base context).
    pub fn free_variables(&self) -> &[String] {
        self.program.free_variables()
    }

    /// Render with `extra` overlaid on a copy of the base context.
    pub fn render(&self, extra: Option<&Context>) -> Result<String, RenderError> {
        match extra {
            Some(extra) if !extra.is_empty() => {
                let mut merged = self.base.clone();
                merged.merge(extra);
                trace!(names = merged.len(), "rendering with merged context");
                self.program.execute(&merged)
            }
            _ => self.program.execute(&self.base),
        }
    }

    /// Render with `ctx` overlaid on the base context.
    pub fn render_with(&self, ctx: &Context) -> Result<String, RenderError> {
        self.render(Some(ctx))
    }
}

/// Compile `source` with base contexts merged left to right.
pub fn compile<I>(source: &str, contexts: I) -> Result<Template, CompileError>
where
    I: IntoIterator<Item = Context>,
{
    Template::with_contexts(source, contexts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::CompileErrorKind;
    use crate::core::value::{Record, Value};
    use proptest::prelude::*;

    fn double() -> Value {
        Value::filter(|v| match v {
            Value::Int(n) => Ok(Value::Int(n * 2)),
            other => Err(format!("cannot double {}", other.type_name())),
        })
    }

    #[test]
    fn test_st009_hello_world() {
        let t = Template::new("Hello {{name}}!").unwrap();
        let ctx = Context::new().with("name", "World");
        assert_eq!(t.render_with(&ctx).unwrap(), "Hello World!");
    }

    #[test]
    fn test_st009_filter_from_base_context() {
        let t = compile("{{n|double}}", [Context::new().with("double", double())]).unwrap();
        assert_eq!(t.render_with(&Context::new().with("n", 21)).unwrap(), "42");
    }

    #[test]
    fn test_st009_for_loop() {
        let t = Template::new("{% for t in items %}{{t}}-{% endfor %}").unwrap();
        let ctx = Context::new().with("items", vec!["a", "b"]);
        assert_eq!(t.render_with(&ctx).unwrap(), "a-b-");
    }

    #[test]
    fn test_st009_loop_variable_not_required() {
        let t = Template::new("{% for item in items %}{{item}}{% endfor %}").unwrap();
        let ctx = Context::new().with("items", vec![1, 2, 3]);
        assert_eq!(t.render_with(&ctx).unwrap(), "123");
        assert_eq!(t.free_variables(), &["items".to_string()]);
    }

    #[test]
    fn test_st009_filter_order() {
        let f = Value::filter(|v| Ok(Value::from(format!("f({v})"))));
        let g = Value::filter(|v| Ok(Value::from(format!("g({v})"))));
        let t = compile("{{x|f|g}}", [Context::new().with("f", f).with("g", g)]).unwrap();
        let out = t.render_with(&Context::new().with("x", "v")).unwrap();
        assert_eq!(out, "g(f(v))");
    }

    #[test]
    fn test_st009_base_contexts_merge_left_to_right() {
        let t = compile(
            "{{greeting}}, {{name}}!",
            [
                Context::new().with("greeting", "Hi").with("name", "base"),
                Context::new().with("greeting", "Hello"),
            ],
        )
        .unwrap();
        assert_eq!(
            t.render_with(&Context::new().with("name", "World")).unwrap(),
            "Hello, World!"
        );
    }

    #[test]
    fn test_st009_render_context_overrides_without_mutating_base() {
        let t = compile("{{value}}", [Context::new().with("value", "constructor")]).unwrap();
        let over = Context::new().with("value", "render");
        assert_eq!(t.render_with(&over).unwrap(), "render");
        assert_eq!(t.render(None).unwrap(), "constructor");
        assert_eq!(t.base_context().get("value"), Some(&Value::from("constructor")));
    }

    #[test]
    fn test_st009_program_exposes_instructions() {
        let t = Template::new("a{{x}}{# note #}b").unwrap();
        let program = t.program();
        assert_eq!(program.instructions().len(), 3);
        assert_eq!(program.free_variables(), t.free_variables());
    }

    #[test]
    fn test_st009_loop_collection_shadowed_by_own_variable() {
        let t = Template::new("{% for x in x %}{{x}}{% endfor %}").unwrap();
        assert_eq!(t.free_variables(), &["x".to_string()]);
        let ctx = Context::new().with("x", vec![1, 2]);
        assert_eq!(t.render_with(&ctx).unwrap(), "12");
    }

    #[test]
    fn test_st009_python_repr_in_collections() {
        let t = Template::new("{{big}} {{small}} {{words}}").unwrap();
        let ctx = Context::new()
            .with("big", 1e16)
            .with("small", 0.00001)
            .with("words", vec!["it's"]);
        assert_eq!(t.render_with(&ctx).unwrap(), r#"1e+16 1e-05 ["it's"]"#);
    }

    #[test]
    fn test_st009_unbound_name() {
        let t = Template::new("Hello, {{name}}!").unwrap();
        assert_eq!(
            t.render(None).unwrap_err(),
            RenderError::UnboundName("name".to_string())
        );
    }

    #[test]
    fn test_st009_unbound_even_in_untaken_branch() {
        let t = Template::new("{% if show %}{{missing}}{% endif %}").unwrap();
        let ctx = Context::new().with("show", false);
        assert_eq!(
            t.render_with(&ctx).unwrap_err(),
            RenderError::UnboundName("missing".to_string())
        );
    }

    #[test]
    fn test_st009_unbound_filter() {
        let t = Template::new("{{x|nope}}").unwrap();
        let err = t.render_with(&Context::new().with("x", 1)).unwrap_err();
        assert_eq!(err, RenderError::UnboundName("nope".to_string()));
    }

    #[test]
    fn test_st009_compile_error_surfaces_at_construction() {
        let err = Template::new("{% if x %}").unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::UnclosedBlock(_)));
    }

    #[test]
    fn test_st009_conditionals() {
        let t = Template::new("{% if show %}Hello, {{name}}!{% endif %}").unwrap();
        let on = Context::new().with("show", true).with("name", "World");
        let off = Context::new().with("show", false).with("name", "World");
        assert_eq!(t.render_with(&on).unwrap(), "Hello, World!");
        assert_eq!(t.render_with(&off).unwrap(), "");
    }

    #[test]
    fn test_st009_nested_loops() {
        let t = Template::new(
            "{% for row in matrix %}{% for item in row %}{{item}} {% endfor %}| {% endfor %}",
        )
        .unwrap();
        let matrix = Value::from(vec![
            Value::from(vec!["a", "b"]),
            Value::from(vec!["c", "d"]),
        ]);
        let out = t.render_with(&Context::new().with("matrix", matrix)).unwrap();
        assert_eq!(out, "a b | c d | ");
    }

    #[test]
    fn test_st009_objects_in_loop() {
        let price = Value::filter(|v| match v {
            Value::Float(x) => Ok(Value::from(format!("${x:.2}"))),
            other => Err(format!("not a price: {other}")),
        });
        let products = vec![
            Record::new("Product").field("name", "Apple").field("price", 1.0).into_value(),
            Record::new("Product").field("name", "Banana").field("price", 0.5).into_value(),
        ];
        let t = compile(
            "{% for p in products %}{{p.name}}: {{p.price|price}} {% endfor %}",
            [Context::new().with("price", price)],
        )
        .unwrap();
        let out = t
            .render_with(&Context::new().with("products", products))
            .unwrap();
        assert_eq!(out, "Apple: $1.00 Banana: $0.50 ");
    }

    #[test]
    fn test_st009_filter_error_aborts_render() {
        let t = compile("a{{s|double}}b", [Context::new().with("double", double())]).unwrap();
        let err = t.render_with(&Context::new().with("s", "x")).unwrap_err();
        assert_eq!(
            err,
            RenderError::Call {
                name: "double".to_string(),
                message: "cannot double str".to_string(),
            }
        );
    }

    #[test]
    fn test_st009_concurrent_renders() {
        let t = Template::new("{% for i in items %}{{i}}{% endfor %}:{{tag}}").unwrap();
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|n| {
                    let t = &t;
                    s.spawn(move || {
                        let ctx = Context::new()
                            .with("items", vec![n, n + 1])
                            .with("tag", format!("t{n}"));
                        t.render_with(&ctx).unwrap()
                    })
                })
                .collect();
            for (n, handle) in handles.into_iter().enumerate() {
                let n = n as i32;
                assert_eq!(handle.join().unwrap(), format!("{}{}:t{}", n, n + 1, n));
            }
        });
    }

    #[test]
    fn test_st009_whitespace_inside_delimiters() {
        let t = Template::new("{{ name }}|{% if  flag  %}y{% endif %}").unwrap();
        let ctx = Context::new().with("name", "test").with("flag", 1);
        assert_eq!(t.render_with(&ctx).unwrap(), "test|y");
    }

    #[test]
    fn test_st009_python_style_text_conversion() {
        let t = Template::new("{{a}} {{b}} {{c}} {{d}}").unwrap();
        let ctx = Context::new()
            .with("a", Value::None)
            .with("b", 3.14)
            .with("c", true)
            .with("d", vec![1, 2]);
        assert_eq!(t.render_with(&ctx).unwrap(), "None 3.14 True [1, 2]");
    }

    proptest! {
        #[test]
        fn prop_literal_text_passes_through(text in "[^{}]{0,64}") {
            let t = Template::new(&text).unwrap();
            prop_assert_eq!(t.render(None).unwrap(), text.clone());
            let noise = Context::new().with("unused", 1);
            prop_assert_eq!(t.render_with(&noise).unwrap(), text);
        }

        #[test]
        fn prop_render_is_pure(items in proptest::collection::vec("[a-z]{0,4}", 0..8), flag in any::<bool>()) {
            let t = Template::new(
                "{% if flag %}on{% endif %}{% for i in items %}[{{i}}]{% endfor %}{{items}}",
            )
            .unwrap();
            let ctx = Context::new().with("items", items).with("flag", flag);
            let first = t.render_with(&ctx).unwrap();
            let second = t.render_with(&ctx).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_repeated_name_renders_identically(value in "[a-z0-9]{0,8}", n in 1usize..6) {
            let source = "{{v}}|".repeat(n);
            let t = Template::new(&source).unwrap();
            prop_assert_eq!(t.free_variables().len(), 1);
            let out = t.render_with(&Context::new().with("v", value.clone())).unwrap();
            prop_assert_eq!(out, format!("{value}|").repeat(n));
        }
    }
}
