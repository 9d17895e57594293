//! The rule table: one named repository entry per syntactic construct.
//!
//! Most regions here have no closing delimiter. Their end patterns are the
//! catalog's terminator lookaheads, so a region closes exactly when a token
//! appears that can only belong to an enclosing or sibling construct. Rule
//! order inside a region is significant: the first rule matching at the
//! leftmost offset wins, and a region's own end pattern is tried after its
//! nested rules unless a rule opts into `end_first`.

use std::collections::BTreeMap;

use crate::grammar::{CaptureMap, RawRule};
use crate::pattern::{
    Pattern, alternate, capture, lookahead, lookbehind, negative_lookahead, optional, sequence,
};

use super::catalog as cat;

const KEYWORD: &str = "keyword.other.sml";
const MODULE_KEYWORD: &str = "keyword.other.module.sml";
const CONTROL: &str = "keyword.control.sml";
const BINDING_EQ: &str = "punctuation.separator.binding.sml";
const CLAUSE_BAR: &str = "punctuation.separator.clause.sml";
const SEPARATOR: &str = "punctuation.separator.sml";
const KEY_VALUE: &str = "punctuation.separator.key-value.sml";
const ASCRIPTION: &str = "keyword.operator.type-ascription.sml";
const ARROW: &str = "keyword.operator.arrow.sml";
const OPERATOR: &str = "keyword.operator.sml";

/// The ordered include list tried at the document root.
pub(super) fn root_patterns() -> Vec<RawRule> {
    vec![
        RawRule::include("#comment"),
        RawRule::include("#signature-dec"),
        RawRule::include("#functor-dec"),
        RawRule::include("#structure-dec"),
        RawRule::include("#dec"),
        RawRule::include("#exp"),
    ]
}

pub(super) fn repository() -> BTreeMap<String, RawRule> {
    let mut repo = BTreeMap::new();
    let mut add = |name: &str, rule: RawRule| {
        repo.insert(name.to_owned(), rule);
    };

    // ------------------------------------------------------------------
    // Lexical rules shared by every context
    // ------------------------------------------------------------------

    // Comments nest: the region includes itself, so balanced `(* (* *) *)`
    // scans as one outer region no matter how deep.
    add(
        "comment",
        RawRule::region(
            &capture(&Pattern::literal("(*")),
            &capture(&Pattern::literal("*)")),
        )
        .scope("comment.block.sml")
        .with_begin_captures(CaptureMap::new().set(1, "punctuation.definition.comment.begin.sml"))
        .with_end_captures(CaptureMap::new().set(1, "punctuation.definition.comment.end.sml"))
        .with_patterns(vec![RawRule::include("#comment")]),
    );

    add(
        "string",
        RawRule::region(&capture(&Pattern::literal("\"")), &capture(&Pattern::literal("\"")))
            .scope("string.quoted.double.sml")
            .with_begin_captures(
                CaptureMap::new().set(1, "punctuation.definition.string.begin.sml"),
            )
            .with_end_captures(CaptureMap::new().set(1, "punctuation.definition.string.end.sml"))
            .with_patterns(vec![
                // a gap: backslash, whitespace (newlines included), backslash
                RawRule::matching(&Pattern::raw("\\\\\\s+\\\\"))
                    .scope("constant.character.escape.sml"),
                RawRule::matching(&Pattern::raw(
                    "\\\\(?:[abtnvfr\"\\\\]|\\^.|[0-9]{3}|u[0-9A-Fa-f]{4})",
                ))
                .scope("constant.character.escape.sml"),
                RawRule::matching(&Pattern::raw("\\\\.")).scope("invalid.illegal.escape.sml"),
            ]),
    );

    add(
        "char",
        RawRule::matching(&Pattern::raw("#\"(?:[^\"\\\\]|\\\\.)*\""))
            .scope("constant.character.sml"),
    );

    add(
        "number",
        RawRule::matching(&Pattern::raw(
            "~?\\b(?:0wx[0-9A-Fa-f]+|0w[0-9]+|0x[0-9A-Fa-f]+|[0-9]+(?:\\.[0-9]+)?(?:[eE]~?[0-9]+)?)\\b",
        ))
        .scope("constant.numeric.sml"),
    );

    add(
        "tyvar",
        RawRule::matching(&Pattern::raw(&format!("''?[A-Za-z][{}]*", cat::WORD_SET)))
            .scope("variable.parameter.sml"),
    );

    add(
        "wildcard",
        RawRule::matching(&Pattern::raw(&format!(
            "(?<![{set}])_(?![{set}])",
            set = cat::WORD_SET
        )))
        .scope("variable.language.wildcard.sml"),
    );

    add(
        "constant",
        RawRule::matching(&cat::plain_keyword(&["false", "nil", "ref", "true"]))
            .scope("constant.language.sml"),
    );

    // A qualified-name prefix: one `Module.` segment, repeated matches
    // handle arbitrarily long paths. The lookahead demands a following
    // segment so a trailing dot is not swallowed.
    add(
        "qualify",
        RawRule::matching(&sequence(&[
            capture(&cat::capital_identifier()),
            capture(&Pattern::literal(".")),
            Pattern::raw(&format!("(?=[A-Za-z_'{}])", cat::OPERATOR_SET)),
        ]))
        .with_captures(
            CaptureMap::new()
                .set(1, "entity.name.module.sml")
                .set(2, "punctuation.accessor.sml"),
        ),
    );

    // The final segment of a qualified value name; case picks the scope
    // (lowercase = value here, uppercase falls to #constructor).
    add(
        "qualified-value",
        RawRule::matching(&sequence(&[
            lookbehind(&Pattern::literal(".")),
            cat::identifier(),
        ]))
        .scope("variable.other.sml"),
    );

    add(
        "constructor",
        RawRule::matching(&cat::capital_identifier()).scope("constant.other.constructor.sml"),
    );

    add(
        "operator",
        RawRule::matching(&cat::symbolic_identifier()).scope(OPERATOR),
    );

    add(
        "clause-bar",
        RawRule::matching(&cat::bounded_op(&["|"])).scope(CLAUSE_BAR),
    );

    add("separator", RawRule::matching(&Pattern::raw("[,;]")).scope(SEPARATOR));

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    add(
        "exp",
        RawRule::container(vec![
            RawRule::include("#comment"),
            RawRule::include("#let-exp"),
            RawRule::include("#control-kw"),
            RawRule::include("#match-clause"),
            RawRule::include("#clause-bar"),
            RawRule::include("#exp-ascription"),
            RawRule::include("#appexp"),
        ]),
    );

    // Application: a run of atomic expressions and infix operators. No
    // application structure is recovered, only classification.
    add(
        "appexp",
        RawRule::container(vec![
            RawRule::include("#atexp"),
            RawRule::include("#operator"),
        ]),
    );

    add(
        "atexp",
        RawRule::container(vec![
            RawRule::include("#string"),
            RawRule::include("#char"),
            RawRule::include("#number"),
            RawRule::include("#constant"),
            RawRule::include("#selector"),
            RawRule::include("#record-exp"),
            RawRule::include("#list-exp"),
            RawRule::include("#paren-exp"),
            RawRule::include("#qualify"),
            RawRule::include("#qualified-value"),
            RawRule::include("#constructor"),
        ]),
    );

    add(
        "control-kw",
        RawRule::matching(&cat::plain_keyword(cat::CONTROL_KEYWORDS)).scope(CONTROL),
    );

    add(
        "let-exp",
        RawRule::region(&cat::keyword(&["let"]), &cat::keyword(&["end"]))
            .with_begin_captures(CaptureMap::new().set(1, CONTROL))
            .with_end_captures(CaptureMap::new().set(1, CONTROL))
            .with_patterns(vec![
                RawRule::include("#comment"),
                RawRule::include("#dec"),
                RawRule::matching(&cat::plain_keyword(&["in"])).scope(CONTROL),
                RawRule::include("#separator"),
                RawRule::include("#exp"),
            ]),
    );

    // One `pat => exp` alternative of a case, fn or handle. The region is
    // entered zero-width right after the introducing keyword (or a `|`),
    // and closes before the next `|` or at the construct's terminator. The
    // body opts into end-first: its end must win the same-offset tie
    // against `#clause-bar` inside `#exp`, or the bar would be consumed
    // inside the body and the next alternative never re-segmented.
    add(
        "match-clause",
        RawRule::region(
            &alternate(&[
                cat::last_words(&["of", "fn", "handle"]),
                cat::last_ops(&["|"]),
            ]),
            &clause_end(),
        )
        .with_patterns(vec![
            RawRule::include("#comment"),
            RawRule::region(&cat::symbolic(&["=>"]), &clause_end())
                .with_begin_captures(CaptureMap::new().set(1, ARROW))
                .with_patterns(vec![RawRule::include("#exp")])
                .end_first(),
            RawRule::include("#pat"),
        ]),
    );

    add(
        "exp-ascription",
        RawRule::region(&cat::symbolic(&[":"]), &cat::type_terminator())
            .with_begin_captures(CaptureMap::new().set(1, ASCRIPTION))
            .with_patterns(vec![RawRule::include("#ty")]),
    );

    add(
        "record-exp",
        RawRule::region(&capture(&Pattern::literal("{")), &capture(&Pattern::literal("}")))
            .scope("meta.record.sml")
            .with_begin_captures(
                CaptureMap::new().set(1, "punctuation.definition.record.begin.sml"),
            )
            .with_end_captures(CaptureMap::new().set(1, "punctuation.definition.record.end.sml"))
            .with_patterns(vec![
                RawRule::include("#comment"),
                record_label_rule("="),
                RawRule::include("#separator"),
                RawRule::include("#exp"),
            ]),
    );

    add(
        "list-exp",
        RawRule::region(&capture(&Pattern::literal("[")), &capture(&Pattern::literal("]")))
            .with_begin_captures(
                CaptureMap::new().set(1, "punctuation.section.brackets.begin.sml"),
            )
            .with_end_captures(CaptureMap::new().set(1, "punctuation.section.brackets.end.sml"))
            .with_patterns(vec![
                RawRule::include("#comment"),
                RawRule::include("#separator"),
                RawRule::include("#exp"),
            ]),
    );

    add(
        "paren-exp",
        RawRule::region(&capture(&Pattern::literal("(")), &capture(&Pattern::literal(")")))
            .with_begin_captures(CaptureMap::new().set(1, "punctuation.section.parens.begin.sml"))
            .with_end_captures(CaptureMap::new().set(1, "punctuation.section.parens.end.sml"))
            .with_patterns(vec![
                RawRule::include("#comment"),
                RawRule::include("#separator"),
                RawRule::include("#exp"),
            ]),
    );

    add(
        "selector",
        RawRule::matching(&sequence(&[
            capture(&Pattern::literal("#")),
            Pattern::raw("\\s*"),
            alternate(&[cat::any_identifier(), Pattern::raw("[1-9][0-9]*")]),
        ]))
        .scope("variable.other.member.sml")
        .with_captures(CaptureMap::new().set(1, "punctuation.definition.selector.sml")),
    );

    // ------------------------------------------------------------------
    // Patterns
    // ------------------------------------------------------------------

    add(
        "pat",
        RawRule::container(vec![
            RawRule::include("#comment"),
            RawRule::matching(&cat::plain_keyword(&["as", "op"])).scope(KEYWORD),
            RawRule::region(&cat::symbolic(&[":"]), &cat::type_terminator())
                .with_begin_captures(CaptureMap::new().set(1, ASCRIPTION))
                .with_patterns(vec![RawRule::include("#ty")]),
            RawRule::matching(&cat::bounded_op(&["::"])).scope(OPERATOR),
            RawRule::include("#atpat"),
        ]),
    );

    add(
        "atpat",
        RawRule::container(vec![
            RawRule::include("#string"),
            RawRule::include("#char"),
            RawRule::include("#number"),
            RawRule::include("#constant"),
            RawRule::include("#wildcard"),
            RawRule::include("#record-pat"),
            RawRule::include("#list-pat"),
            RawRule::include("#paren-pat"),
            RawRule::include("#qualify"),
            RawRule::include("#constructor"),
            RawRule::include("#variable"),
        ]),
    );

    add(
        "variable",
        RawRule::matching(&cat::identifier()).scope("variable.other.sml"),
    );

    add(
        "record-pat",
        RawRule::region(&capture(&Pattern::literal("{")), &capture(&Pattern::literal("}")))
            .scope("meta.record.pattern.sml")
            .with_begin_captures(
                CaptureMap::new().set(1, "punctuation.definition.record.begin.sml"),
            )
            .with_end_captures(CaptureMap::new().set(1, "punctuation.definition.record.end.sml"))
            .with_patterns(vec![
                RawRule::include("#comment"),
                RawRule::matching(&Pattern::literal("...")).scope("keyword.operator.ellipsis.sml"),
                record_label_rule("="),
                RawRule::include("#separator"),
                RawRule::include("#pat"),
            ]),
    );

    add(
        "list-pat",
        RawRule::region(&capture(&Pattern::literal("[")), &capture(&Pattern::literal("]")))
            .with_begin_captures(
                CaptureMap::new().set(1, "punctuation.section.brackets.begin.sml"),
            )
            .with_end_captures(CaptureMap::new().set(1, "punctuation.section.brackets.end.sml"))
            .with_patterns(vec![
                RawRule::include("#comment"),
                RawRule::include("#separator"),
                RawRule::include("#pat"),
            ]),
    );

    add(
        "paren-pat",
        RawRule::region(&capture(&Pattern::literal("(")), &capture(&Pattern::literal(")")))
            .with_begin_captures(CaptureMap::new().set(1, "punctuation.section.parens.begin.sml"))
            .with_end_captures(CaptureMap::new().set(1, "punctuation.section.parens.end.sml"))
            .with_patterns(vec![
                RawRule::include("#comment"),
                RawRule::include("#separator"),
                RawRule::include("#pat"),
            ]),
    );

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    add(
        "ty",
        RawRule::container(vec![
            RawRule::include("#comment"),
            RawRule::include("#tyvar"),
            RawRule::include("#ty-record"),
            RawRule::include("#ty-paren"),
            RawRule::matching(&cat::bounded_op(&["->"])).scope(ARROW),
            RawRule::matching(&cat::bounded_op(&["*"])).scope(OPERATOR),
            RawRule::include("#qualify"),
            RawRule::matching(&cat::any_identifier()).scope("support.type.sml"),
        ]),
    );

    add(
        "ty-record",
        RawRule::region(&capture(&Pattern::literal("{")), &capture(&Pattern::literal("}")))
            .with_begin_captures(
                CaptureMap::new().set(1, "punctuation.definition.record.begin.sml"),
            )
            .with_end_captures(CaptureMap::new().set(1, "punctuation.definition.record.end.sml"))
            .with_patterns(vec![
                RawRule::include("#comment"),
                record_label_rule(":"),
                RawRule::include("#separator"),
                RawRule::include("#ty"),
            ]),
    );

    add(
        "ty-paren",
        RawRule::region(&capture(&Pattern::literal("(")), &capture(&Pattern::literal(")")))
            .with_begin_captures(CaptureMap::new().set(1, "punctuation.section.parens.begin.sml"))
            .with_end_captures(CaptureMap::new().set(1, "punctuation.section.parens.end.sml"))
            .with_patterns(vec![
                RawRule::include("#comment"),
                RawRule::include("#separator"),
                RawRule::include("#ty"),
            ]),
    );

    // ------------------------------------------------------------------
    // Core declarations
    // ------------------------------------------------------------------

    add(
        "dec",
        RawRule::container(vec![
            RawRule::include("#comment"),
            RawRule::include("#val-dec"),
            RawRule::include("#fun-dec"),
            RawRule::include("#type-dec"),
            RawRule::include("#datatype-dec"),
            RawRule::include("#exception-dec"),
            RawRule::include("#open-dec"),
            RawRule::include("#fixity-dec"),
            RawRule::include("#local-dec"),
        ]),
    );

    add(
        "val-dec",
        RawRule::region(&cat::keyword(&["val"]), &cat::declaration_terminator())
            .scope("meta.declaration.value.sml")
            .with_begin_captures(CaptureMap::new().set(1, KEYWORD))
            .with_patterns(vec![
                RawRule::include("#comment"),
                RawRule::matching(&cat::plain_keyword(&["and", "rec"])).scope(KEYWORD),
                ascription_region(),
                binding_body("#exp"),
                RawRule::include("#pat"),
            ]),
    );

    add(
        "fun-dec",
        RawRule::region(&cat::keyword(&["fun"]), &cat::declaration_terminator())
            .scope("meta.declaration.function.sml")
            .with_begin_captures(CaptureMap::new().set(1, KEYWORD))
            .with_patterns(vec![
                RawRule::include("#comment"),
                RawRule::matching(&cat::plain_keyword(&["and", "op"])).scope(KEYWORD),
                RawRule::include("#clause-bar"),
                // The clause head: the identifier right after fun/and/op or
                // a clause bar names the function being bound.
                RawRule::matching(&sequence(&[
                    alternate(&[
                        cat::last_words(&["fun", "and", "op"]),
                        cat::last_ops(&["|"]),
                    ]),
                    Pattern::raw("\\s*"),
                    capture(&alternate(&[cat::identifier(), cat::symbolic_identifier()])),
                ]))
                .with_captures(CaptureMap::new().set(1, "entity.name.function.sml")),
                // Return-type ascription is checked before the body: when
                // both a colon and an equals are present the colon comes
                // first and owns the type sub-region.
                ascription_region(),
                binding_body("#exp"),
                RawRule::include("#pat"),
            ]),
    );

    add(
        "type-dec",
        RawRule::region(&cat::keyword(&["type", "eqtype"]), &cat::declaration_terminator())
            .scope("meta.declaration.type.sml")
            .with_begin_captures(CaptureMap::new().set(1, KEYWORD))
            .with_patterns(vec![
                RawRule::include("#comment"),
                RawRule::matching(&cat::plain_keyword(&["and"])).scope(KEYWORD),
                RawRule::include("#tyvar"),
                RawRule::include("#ty-paren"),
                RawRule::region(&cat::symbolic(&["="]), &cat::type_terminator())
                    .with_begin_captures(CaptureMap::new().set(1, BINDING_EQ))
                    .with_patterns(vec![RawRule::include("#ty")]),
                RawRule::matching(&cat::any_identifier()).scope("entity.name.type.sml"),
            ]),
    );

    add(
        "datatype-dec",
        RawRule::region(
            &cat::keyword(&["datatype", "abstype"]),
            &cat::declaration_terminator(),
        )
        .scope("meta.declaration.datatype.sml")
        .with_begin_captures(CaptureMap::new().set(1, KEYWORD))
        .with_patterns(vec![
            RawRule::include("#comment"),
            RawRule::matching(&cat::plain_keyword(&["and", "with", "withtype"])).scope(KEYWORD),
            RawRule::include("#tyvar"),
            RawRule::include("#ty-paren"),
            RawRule::region(
                &cat::symbolic(&["="]),
                &alternate(&[
                    lookahead(&cat::plain_keyword(&["with", "withtype"])),
                    cat::binding_terminator(),
                ]),
            )
            .with_begin_captures(CaptureMap::new().set(1, BINDING_EQ))
            .with_patterns(vec![
                RawRule::include("#comment"),
                // `of ty` attaches a payload to the constructor just named
                RawRule::region(
                    &cat::keyword(&["of"]),
                    &alternate(&[
                        lookahead(&cat::bounded_op(&["|"])),
                        cat::binding_terminator(),
                    ]),
                )
                .with_begin_captures(CaptureMap::new().set(1, KEYWORD))
                .with_patterns(vec![RawRule::include("#ty")]),
                RawRule::include("#clause-bar"),
                RawRule::matching(&cat::any_identifier())
                    .scope("constant.other.constructor.declaration.sml"),
            ]),
            RawRule::matching(&cat::any_identifier()).scope("entity.name.type.sml"),
        ]),
    );

    add(
        "exception-dec",
        RawRule::region(&cat::keyword(&["exception"]), &cat::declaration_terminator())
            .scope("meta.declaration.exception.sml")
            .with_begin_captures(CaptureMap::new().set(1, KEYWORD))
            .with_patterns(vec![
                RawRule::include("#comment"),
                RawRule::matching(&cat::plain_keyword(&["and"])).scope(KEYWORD),
                RawRule::region(&cat::keyword(&["of"]), &cat::binding_terminator())
                    .with_begin_captures(CaptureMap::new().set(1, KEYWORD))
                    .with_patterns(vec![RawRule::include("#ty")]),
                RawRule::region(&cat::symbolic(&["="]), &cat::binding_terminator())
                    .with_begin_captures(CaptureMap::new().set(1, BINDING_EQ))
                    .with_patterns(vec![
                        RawRule::include("#qualify"),
                        RawRule::include("#constructor"),
                    ]),
                RawRule::matching(&cat::any_identifier()).scope("entity.name.exception.sml"),
            ]),
    );

    add(
        "open-dec",
        RawRule::region(&cat::keyword(&["open"]), &cat::declaration_terminator())
            .with_begin_captures(CaptureMap::new().set(1, KEYWORD))
            .with_patterns(vec![
                RawRule::include("#comment"),
                RawRule::include("#qualify"),
                RawRule::matching(&cat::capital_identifier()).scope("entity.name.module.sml"),
            ]),
    );

    add(
        "fixity-dec",
        RawRule::matching(&sequence(&[
            cat::keyword(&["infix", "infixr", "nonfix"]),
            optional(&sequence(&[
                Pattern::raw("\\s+"),
                capture(&Pattern::raw("[0-9]+")),
            ])),
        ]))
        .with_captures(
            CaptureMap::new()
                .set(1, KEYWORD)
                .set(2, "constant.numeric.sml"),
        ),
    );

    add(
        "local-dec",
        RawRule::region(&cat::keyword(&["local"]), &cat::keyword(&["end"]))
            .with_begin_captures(CaptureMap::new().set(1, KEYWORD))
            .with_end_captures(CaptureMap::new().set(1, KEYWORD))
            .with_patterns(vec![
                RawRule::include("#comment"),
                RawRule::matching(&cat::plain_keyword(&["in"])).scope(KEYWORD),
                RawRule::include("#dec"),
            ]),
    );

    // ------------------------------------------------------------------
    // Module language
    // ------------------------------------------------------------------

    add(
        "structure-dec",
        RawRule::region(&cat::keyword(&["structure"]), &cat::declaration_terminator())
            .scope("meta.declaration.structure.sml")
            .with_begin_captures(CaptureMap::new().set(1, MODULE_KEYWORD))
            .with_patterns(vec![
                RawRule::include("#comment"),
                RawRule::matching(&cat::plain_keyword(&["and"])).scope(MODULE_KEYWORD),
                bound_name(&["structure", "and"], "entity.name.module.sml"),
                signature_ascription(),
                binding_body("#strexp"),
            ]),
    );

    add(
        "strexp",
        RawRule::container(vec![
            RawRule::include("#comment"),
            RawRule::include("#struct-body"),
            // functor application arguments
            RawRule::region(&capture(&Pattern::literal("(")), &capture(&Pattern::literal(")")))
                .with_begin_captures(
                    CaptureMap::new().set(1, "punctuation.section.parens.begin.sml"),
                )
                .with_end_captures(
                    CaptureMap::new().set(1, "punctuation.section.parens.end.sml"),
                )
                .with_patterns(vec![
                    RawRule::include("#strexp"),
                    RawRule::include("#dec"),
                ]),
            RawRule::include("#qualify"),
            RawRule::matching(&cat::capital_identifier()).scope("entity.name.module.sml"),
        ]),
    );

    add(
        "struct-body",
        RawRule::region(&cat::keyword(&["struct"]), &cat::keyword(&["end"]))
            .scope("meta.structure.sml")
            .with_begin_captures(CaptureMap::new().set(1, MODULE_KEYWORD))
            .with_end_captures(CaptureMap::new().set(1, MODULE_KEYWORD))
            .with_patterns(vec![
                RawRule::include("#comment"),
                RawRule::include("#structure-dec"),
                RawRule::include("#dec"),
            ]),
    );

    add(
        "signature-dec",
        RawRule::region(&cat::keyword(&["signature"]), &cat::declaration_terminator())
            .scope("meta.declaration.signature.sml")
            .with_begin_captures(CaptureMap::new().set(1, MODULE_KEYWORD))
            .with_patterns(vec![
                RawRule::include("#comment"),
                RawRule::matching(&cat::plain_keyword(&["and"])).scope(MODULE_KEYWORD),
                bound_name(&["signature", "and"], "entity.name.signature.sml"),
                binding_body("#sigexp"),
            ]),
    );

    add(
        "sigexp",
        RawRule::container(vec![
            RawRule::include("#comment"),
            RawRule::include("#sig-body"),
            RawRule::include("#where-clause"),
            RawRule::include("#qualify"),
            RawRule::matching(&cat::capital_identifier()).scope("entity.name.signature.sml"),
        ]),
    );

    add(
        "sig-body",
        RawRule::region(&cat::keyword(&["sig"]), &cat::keyword(&["end"]))
            .scope("meta.signature.sml")
            .with_begin_captures(CaptureMap::new().set(1, MODULE_KEYWORD))
            .with_end_captures(CaptureMap::new().set(1, MODULE_KEYWORD))
            .with_patterns(vec![
                RawRule::include("#comment"),
                RawRule::include("#spec"),
            ]),
    );

    // `where type` refines a signature: the clause's terminator must NOT
    // contain `type`, or the very binding the clause introduces would end
    // it. This is the one place the reduced keyword set is correct.
    add(
        "where-clause",
        RawRule::region(
            &cat::keyword(&["where"]),
            &alternate(&[
                lookahead(&cat::bounded_op(&["="])),
                cat::declaration_terminator_without_type(),
            ]),
        )
        .with_begin_captures(CaptureMap::new().set(1, MODULE_KEYWORD))
        .with_patterns(vec![
            RawRule::include("#comment"),
            RawRule::matching(&cat::plain_keyword(&["and"])).scope(MODULE_KEYWORD),
            RawRule::include("#type-dec"),
        ]),
    );

    add(
        "functor-dec",
        RawRule::region(&cat::keyword(&["functor"]), &cat::declaration_terminator())
            .scope("meta.declaration.functor.sml")
            .with_begin_captures(CaptureMap::new().set(1, MODULE_KEYWORD))
            .with_patterns(vec![
                RawRule::include("#comment"),
                RawRule::matching(&cat::plain_keyword(&["and"])).scope(MODULE_KEYWORD),
                bound_name(&["functor", "and"], "entity.name.functor.sml"),
                RawRule::region(&capture(&Pattern::literal("(")), &capture(&Pattern::literal(")")))
                    .with_begin_captures(
                        CaptureMap::new().set(1, "punctuation.section.parens.begin.sml"),
                    )
                    .with_end_captures(
                        CaptureMap::new().set(1, "punctuation.section.parens.end.sml"),
                    )
                    .with_patterns(vec![
                        RawRule::include("#comment"),
                        RawRule::include("#spec"),
                    ]),
                signature_ascription(),
                binding_body("#strexp"),
            ]),
    );

    add(
        "spec",
        RawRule::container(vec![
            RawRule::include("#comment"),
            RawRule::include("#include-spec"),
            RawRule::include("#sharing-spec"),
            RawRule::include("#structure-dec"),
            RawRule::include("#dec"),
        ]),
    );

    add(
        "include-spec",
        RawRule::region(&cat::keyword(&["include"]), &cat::declaration_terminator())
            .with_begin_captures(CaptureMap::new().set(1, MODULE_KEYWORD))
            .with_patterns(vec![
                RawRule::include("#comment"),
                RawRule::include("#sigexp"),
            ]),
    );

    add(
        "sharing-spec",
        RawRule::matching(&sequence(&[
            cat::keyword(&["sharing"]),
            optional(&sequence(&[
                Pattern::raw("\\s+"),
                capture(&Pattern::raw("type\\b")),
            ])),
        ]))
        .with_captures(
            CaptureMap::new()
                .set(1, MODULE_KEYWORD)
                .set(2, KEYWORD),
        ),
    );

    repo
}

/// End pattern of a match clause and of its body: the next clause bar, or
/// whatever ends the enclosing binding.
fn clause_end() -> Pattern {
    alternate(&[
        lookahead(&cat::bounded_op(&["|"])),
        cat::binding_terminator(),
    ])
}

/// `: ty`, a type-ascription sub-region ending where the type ends.
fn ascription_region() -> RawRule {
    RawRule::region(&cat::symbolic(&[":"]), &cat::type_terminator())
        .with_begin_captures(CaptureMap::new().set(1, ASCRIPTION))
        .with_patterns(vec![RawRule::include("#ty")])
}

/// `: SIG` or `:> SIG` on a structure or functor binding.
fn signature_ascription() -> RawRule {
    RawRule::region(
        &cat::symbolic(&[":>", ":"]),
        &alternate(&[
            lookahead(&cat::bounded_op(&["="])),
            cat::binding_terminator(),
        ]),
    )
    .with_begin_captures(CaptureMap::new().set(1, "keyword.operator.ascription.sml"))
    .with_patterns(vec![RawRule::include("#sigexp")])
}

/// `= ...`, the right-hand side of a binding. Ends at the binding
/// terminator, so an `and` continuation pops back out to the enclosing
/// binding region.
fn binding_body(content: &str) -> RawRule {
    RawRule::region(&cat::symbolic(&["="]), &cat::binding_terminator())
        .with_begin_captures(CaptureMap::new().set(1, BINDING_EQ))
        .with_patterns(vec![RawRule::include(content)])
}

/// The identifier bound right after one of `keywords` (structure X,
/// signature S, functor F, and continuations).
fn bound_name(keywords: &[&str], scope: &str) -> RawRule {
    RawRule::matching(&sequence(&[
        cat::last_words(keywords),
        Pattern::raw("\\s*"),
        capture(&cat::any_identifier()),
    ]))
    .with_captures(CaptureMap::new().set(1, scope))
}

/// `label = ...` / `label : ...` inside a record. The separator char is a
/// parameter because expression and pattern rows bind with `=` while type
/// rows ascribe with `:`.
fn record_label_rule(sep: &str) -> RawRule {
    RawRule::matching(&sequence(&[
        capture(&alternate(&[
            cat::any_identifier(),
            Pattern::raw("[1-9][0-9]*"),
        ])),
        Pattern::raw("\\s*"),
        capture(&Pattern::literal(sep)),
        negative_lookahead(&Pattern::raw(&format!("[{}]", cat::OPERATOR_SET))),
    ]))
    .with_captures(
        CaptureMap::new()
            .set(1, "variable.other.member.sml")
            .set(2, KEY_VALUE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_contains_every_construct() {
        let repo = repository();
        for name in [
            "comment",
            "string",
            "char",
            "number",
            "exp",
            "appexp",
            "atexp",
            "match-clause",
            "pat",
            "atpat",
            "ty",
            "dec",
            "val-dec",
            "fun-dec",
            "type-dec",
            "datatype-dec",
            "exception-dec",
            "structure-dec",
            "strexp",
            "signature-dec",
            "sigexp",
            "where-clause",
            "functor-dec",
            "spec",
            "qualify",
        ] {
            assert!(repo.contains_key(name), "missing rule {name}");
        }
    }

    #[test]
    fn comment_rule_includes_itself() {
        let repo = repository();
        let comment = &repo["comment"];
        assert_eq!(comment.patterns.len(), 1);
        assert_eq!(comment.patterns[0].include.as_deref(), Some("#comment"));
    }

    #[test]
    fn ascription_is_listed_before_binding_body() {
        // ordered disambiguation: the colon sub-region must be tried before
        // the equals sub-region in function and value bindings
        let repo = repository();
        for name in ["val-dec", "fun-dec"] {
            let patterns = &repo[name].patterns;
            let colon = patterns
                .iter()
                .position(|r| r.begin.as_deref().is_some_and(|b| b.contains("(?::)")))
                .unwrap();
            let equals = patterns
                .iter()
                .position(|r| r.begin.as_deref().is_some_and(|b| b.contains("(?:=)")))
                .unwrap();
            assert!(colon < equals, "{name}: colon region must precede body");
        }
    }

    #[test]
    fn where_clause_terminator_excludes_type() {
        let repo = repository();
        let end = repo["where-clause"].end.as_deref().unwrap();
        assert!(!end.contains("|type|"));
        assert!(end.contains("val"));

        let val_end = repo["val-dec"].end.as_deref().unwrap();
        assert!(val_end.contains("|type|"));
    }
}
