//! End-to-end tests: Python source in, CoffeeScript text out.

use py2coffee::{
    DiagnosticKind, Error, ReadError, RenderError, RenderOptions, translate, translate_batch,
    translate_with,
};

fn coffee(source: &str) -> String {
    translate(source).expect("translation failed")
}

// ============================================================================
// Scaffolding
// ============================================================================

#[test]
fn function_with_default() {
    assert_eq!(
        coffee("def f(a, b=1):\n    return a+b\n"),
        "f = (a, b=1) ->\n    return a+b\n"
    );
}

#[test]
fn method_receiver_becomes_at() {
    assert_eq!(
        coffee("class C(Base):\n    def m(self, x):\n        return self.x\n"),
        "class C extends Base\n    m: (x) ->\n        return @x\n"
    );
}

#[test]
fn decorated_property() {
    let source = "\
class C(object):
    @property
    def size(self):
        return self._size
";
    assert_eq!(
        coffee(source),
        "class C extends object\n    @property\n    size: ->\n        return @_size\n"
    );
}

#[test]
fn nested_function_sees_method_receiver() {
    let source = "\
class C:
    def m(self):
        def inner():
            return self.v
        return inner
";
    insta::assert_snapshot!(coffee(source), @r"
    class C
        m: ->
            inner = ->
                return @v
            return inner
    ");
}

#[test]
fn lambda_and_conditional_expression() {
    assert_eq!(
        coffee("f = lambda a, b=2: a if b else None\n"),
        "f=(a, b=2) -> if b then a else null\n"
    );
}

// ============================================================================
// Statements
// ============================================================================

#[test]
fn imports_become_annotated_pass() {
    assert_eq!(coffee("import os\n"), "pass # import os\n");
    assert_eq!(
        coffee("from os import path as p, sep\n"),
        "pass # from os import path as p,sep\n"
    );
}

#[test]
fn chained_comparison() {
    assert_eq!(coffee("a < b < c\n"), "a<b<c\n");
}

#[test]
fn simple_statements() {
    let source = "\
a = b = 1
x += 1
del a, b
assert x, 'msg'
global g, h
raise ValueError('bad') from err
";
    assert_eq!(
        coffee(source),
        "a=b=1\nx+=1\ndel a,b\nassert x, 'msg'\nglobal g,h\nraise ValueError('bad') from err\n"
    );
}

#[test]
fn try_except_finally() {
    let source = "\
try:
    f()
except ValueError as e:
    pass
finally:
    g()
";
    assert_eq!(
        coffee(source),
        "try\n    f()\nexcept ValueError as e:\n    pass\nfinally:\n    g()\n"
    );
}

#[test]
fn loops_with_else() {
    let source = "\
for x in items:
    continue
else:  # done
    pass
";
    assert_eq!(
        coffee(source),
        "for x in items:\n    continue\nelse: # done\n    pass\n"
    );
}

// ============================================================================
// Token synchronization
// ============================================================================

#[test]
fn standalone_comment_appears_once_before_its_statement() {
    assert_eq!(coffee("x = 1\n# note\ny = 2\n"), "x=1\n# note\ny=2\n");
}

#[test]
fn every_comment_and_blank_line_survives_once() {
    let source = "\
# a
import os
# b

def f():
    # c
    x = 1
    # d
    return x
# e
";
    assert_eq!(
        coffee(source),
        "# a\npass # import os\n# b\n\nf = ->\n    # c\n    x=1\n    # d\n    return x\n# e\n"
    );
}

#[test]
fn trailing_comments_follow_their_lines() {
    assert_eq!(
        coffee("if x:  # check\n    pass  # nothing\n"),
        "if x: # check\n    pass # nothing\n"
    );
}

#[test]
fn strings_keep_their_spelling() {
    assert_eq!(
        coffee("x = r'\\d+' + \"it's\"\n"),
        "x=r'\\d+'+\"it's\"\n"
    );
}

#[test]
fn call_arguments_keep_order_and_spelling() {
    assert_eq!(
        coffee("f(k=\"x\", *['y'], **opts)\n"),
        "f(k=\"x\",*['y'],**opts)\n"
    );
}

#[test]
fn self_in_plain_function_becomes_at() {
    assert_eq!(
        coffee("def f(self):\n    return self.x\n"),
        "f = (@) ->\n    return @x\n"
    );
}

#[test]
fn nested_negation_is_not_a_decrement() {
    assert_eq!(coffee("x = -(-1)\n"), "x=-(-1)\n");
}

#[test]
fn multi_line_docstring_is_verbatim() {
    let source = "def f():\n    \"\"\"Doc\n    more\"\"\"\n    return 1\n";
    assert_eq!(
        coffee(source),
        "f = ->\n    \"\"\"Doc\n    more\"\"\"\n    return 1\n"
    );
}

#[test]
fn dict_keeps_interior_comments_and_drops_blank_lines() {
    let source = "\
d = {
    # first
    'a': 1,  # one

    'b': 2,
}
";
    insta::assert_snapshot!(coffee(source), @r"
    d={
        # first
        'a':1 # one
        'b':2
    }
    ");
}

#[test]
fn dict_on_statement_line_does_not_repeat_comment() {
    assert_eq!(coffee("d = {'a': 1}  # note\n"), "d={\n    'a':1\n} # note\n");
}

// ============================================================================
// Operators and options
// ============================================================================

#[test]
fn matmult_placeholder_is_reported() {
    let rendered = translate_with("x = a @ b\n", &RenderOptions::default()).unwrap();
    assert_eq!(rendered.text, "x=a<MatMult>b\n");
    assert_eq!(rendered.diagnostics.len(), 1);
    assert_eq!(
        rendered.diagnostics[0].kind,
        DiagnosticKind::UnsupportedOperator
    );
}

#[test]
fn matmult_is_fatal_when_strict() {
    let options = RenderOptions {
        strict_operators: true,
        ..RenderOptions::default()
    };
    let err = translate_with("x = a @ b\n", &options).unwrap_err();
    assert!(matches!(
        err,
        Error::Render(RenderError::UnsupportedOperator { line: 1, .. })
    ));
}

#[test]
fn warnings_reach_an_installed_subscriber() {
    let subscriber = tracing_subscriber::fmt().with_test_writer().finish();
    let rendered = tracing::subscriber::with_default(subscriber, || {
        translate_with("y = a @ b\n", &RenderOptions::default())
    })
    .unwrap();
    assert_eq!(rendered.text, "y=a<MatMult>b\n");
}

#[test]
fn options_from_toml() {
    let options: RenderOptions = toml::from_str("indent_unit = \"  \"\n").unwrap();
    assert_eq!(options.indent_unit, "  ");
    assert!(!options.strict_operators);

    let rendered = translate_with("while x:\n    x -= 1\n", &options).unwrap();
    assert_eq!(rendered.text, "while x:\n  x-=1\n");
}

// ============================================================================
// Failures and batches
// ============================================================================

#[test]
fn unsupported_construct_is_fatal() {
    let err = translate("match x:\n    case 1:\n        pass\n").unwrap_err();
    assert!(matches!(
        err,
        Error::Read(ReadError::UnsupportedNodeKind { ref kind, line: 1 }) if kind == "match_statement"
    ));
}

#[test]
fn batch_isolates_failures() {
    let files = [("ok.py", "x = 1\n"), ("bad.py", "x = (\n"), ("also_ok.py", "pass\n")];
    let results = translate_batch(&files, &RenderOptions::default());

    let names: Vec<_> = results.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["ok.py", "bad.py", "also_ok.py"]);

    assert_eq!(results[0].1.as_ref().unwrap().text, "x=1\n");
    assert!(matches!(results[1].1, Err(Error::Lex(_))));
    assert_eq!(results[2].1.as_ref().unwrap().text, "pass\n");
}
