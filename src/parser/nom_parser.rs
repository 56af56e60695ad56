//! The tree-description text format.
//!
//! ```raw
//! tree main = Sequencer {
//!     key patience : float = 2.5
//!     Timeout (duration <- patience) {
//!         Patrol
//!     }
//! }
//! ```
//!
//! `prop <- "text"` assigns a literal, `prop <- name` binds the property to
//! the blackboard key of that name. A node type that is not registered
//! resolves to another `tree` definition in the same source.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{alpha1, alphanumeric1, char, multispace0, newline, none_of, one_of, space0},
    combinator::{opt, recognize, value},
    multi::{many0, many1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

/// Everything parsed from one source: tree definitions by order of
/// appearance.
#[derive(Debug, PartialEq)]
pub struct TreeSource<'src> {
    pub tree_defs: Vec<TreeRootDef<'src>>,
}

#[derive(Debug, PartialEq)]
pub struct TreeRootDef<'src> {
    pub(crate) name: &'src str,
    pub(crate) root: TreeDef<'src>,
}

#[derive(Debug, PartialEq)]
pub struct TreeDef<'src> {
    pub(crate) ty: &'src str,
    pub(crate) props: Vec<PropDef<'src>>,
    pub(crate) children: Vec<TreeDef<'src>>,
    pub(crate) keys: Vec<KeyDef<'src>>,
}

impl<'src> TreeDef<'src> {
    #[allow(dead_code)]
    pub(crate) fn new(ty: &'src str) -> Self {
        Self {
            ty,
            props: vec![],
            children: vec![],
            keys: vec![],
        }
    }

    fn from_elems(ty: &'src str, props: Vec<PropDef<'src>>, elems: Vec<TreeElem<'src>>) -> Self {
        let (children, keys) = elems.into_iter().fold((vec![], vec![]), |mut acc, cur| {
            match cur {
                TreeElem::Node(node) => acc.0.push(node),
                TreeElem::Key(key) => acc.1.push(key),
            }
            acc
        });
        Self {
            ty,
            props,
            children,
            keys,
        }
    }
}

/// A blackboard key declaration, `key name : type = init`.
#[derive(Debug, PartialEq)]
pub struct KeyDef<'src> {
    pub(crate) name: &'src str,
    pub(crate) ty: &'src str,
    pub(crate) init: String,
}

#[derive(Debug, PartialEq)]
pub enum PropSource<'src> {
    /// Decoded from a quoted string, so it is owned.
    Literal(String),
    KeyRef(&'src str),
}

#[derive(Debug, PartialEq)]
pub struct PropDef<'src> {
    pub(crate) name: &'src str,
    pub(crate) value: PropSource<'src>,
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn newlines(i: &str) -> IResult<&str, ()> {
    delimited(space0, many1(one_of("\r\n")), space0)(i).map(|(rest, _)| (rest, ()))
}

fn open_paren(i: &str) -> IResult<&str, ()> {
    value((), delimited(space0, char('('), space0))(i)
}

fn close_paren(i: &str) -> IResult<&str, ()> {
    value((), delimited(space0, char(')'), space0))(i)
}

fn open_brace(i: &str) -> IResult<&str, ()> {
    value((), delimited(space0, char('{'), space0))(i)
}

fn close_brace(i: &str) -> IResult<&str, ()> {
    value((), delimited(space0, char('}'), space0))(i)
}

fn line_comment<T>(i: &str) -> IResult<&str, Option<T>> {
    let (i, _) = tuple((space0, char('#'), opt(is_not("\n\r"))))(i)?;

    Ok((i, None))
}

fn line_comment_tree_elem(i: &str) -> IResult<&str, Option<TreeElem>> {
    line_comment::<TreeElem>(i)
}

fn some<I, R>(f: impl Fn(I) -> IResult<I, R>) -> impl Fn(I) -> IResult<I, Option<R>> {
    move |i| {
        let (i, res) = f(i)?;
        Ok((i, Some(res)))
    }
}

fn str_literal(input: &str) -> IResult<&str, String> {
    let (r, val) = delimited(
        preceded(multispace0, char('\"')),
        many0(none_of("\"")),
        terminated(char('"'), space0),
    )(input)?;
    Ok((
        r,
        val.iter()
            .collect::<String>()
            .replace("\\\\", "\\")
            .replace("\\n", "\n"),
    ))
}

fn prop_literal(i: &str) -> IResult<&str, PropSource> {
    let (i, s) = str_literal(i)?;
    Ok((i, PropSource::Literal(s)))
}

fn prop_key_ref(i: &str) -> IResult<&str, PropSource> {
    let (i, s) = identifier(i)?;
    Ok((i, PropSource::KeyRef(s)))
}

fn prop_def(i: &str) -> IResult<&str, PropDef> {
    let (i, name) = delimited(space0, identifier, space0)(i)?;

    let (i, _) = delimited(space0, tag("<-"), space0)(i)?;

    let (i, value) = delimited(space0, alt((prop_literal, prop_key_ref)), space0)(i)?;

    Ok((i, PropDef { name, value }))
}

fn prop_defs(i: &str) -> IResult<&str, Vec<PropDef>> {
    many0(delimited(
        multispace0,
        prop_def,
        many0(pair(multispace0, char(','))),
    ))(i)
}

/// A bare initializer token, e.g. `2.5`, `-1`, `true`.
fn bare_token(i: &str) -> IResult<&str, &str> {
    is_not(" \t\r\n#,(){}")(i)
}

fn key_decl(i: &str) -> IResult<&str, TreeElem> {
    let (i, _key) = delimited(space0, tag("key"), space0)(i)?;

    let (i, name) = delimited(space0, identifier, space0)(i)?;

    let (i, _) = delimited(space0, char(':'), space0)(i)?;

    let (i, ty) = delimited(space0, identifier, space0)(i)?;

    let (i, _) = delimited(space0, char('='), space0)(i)?;

    let (i, init) = alt((str_literal, |i| {
        bare_token(i).map(|(i, s)| (i, s.to_string()))
    }))(i)?;

    let (i, _) = opt(line_comment_tree_elem)(i)?;

    Ok((i, TreeElem::Key(KeyDef { name, ty, init })))
}

#[derive(Debug)]
enum TreeElem<'src> {
    Node(TreeDef<'src>),
    Key(KeyDef<'src>),
}

fn tree_children(i: &str) -> IResult<&str, Vec<TreeElem>> {
    let (i, _) = many0(newlines)(i)?;

    let (i, v) = many0(delimited(
        space0,
        alt((line_comment, some(key_decl), some(parse_tree_elem))),
        many0(newlines),
    ))(i)?;

    let (i, _) = many0(newlines)(i)?;

    Ok((i, v.into_iter().flatten().collect()))
}

fn parse_tree_node(i: &str) -> IResult<&str, TreeDef> {
    let (i, ty) = delimited(space0, identifier, space0)(i)?;

    let (i, props) = opt(delimited(open_paren, prop_defs, close_paren))(i)?;

    let (i, children) = opt(delimited(open_brace, tree_children, close_brace))(i)?;

    let (i, _) = opt(line_comment_tree_elem)(i)?;

    Ok((
        i,
        TreeDef::from_elems(ty, props.unwrap_or_default(), children.unwrap_or_default()),
    ))
}

fn parse_tree_elem(i: &str) -> IResult<&str, TreeElem> {
    let (i, elem) = parse_tree_node(i)?;
    Ok((i, TreeElem::Node(elem)))
}

fn parse_tree(i: &str) -> IResult<&str, TreeRootDef> {
    let (i, _) = delimited(multispace0, tag("tree"), space0)(i)?;

    let (i, name) = delimited(space0, identifier, space0)(i)?;

    let (i, _) = delimited(space0, tag("="), space0)(i)?;

    let (i, root) = parse_tree_node(i)?;

    Ok((i, TreeRootDef { name, root }))
}

pub fn parse_file(i: &str) -> IResult<&str, TreeSource> {
    let (i, trees) = many0(alt((
        delimited(multispace0, line_comment, newline),
        some(parse_tree),
    )))(i)?;

    // Eat up trailing whitespace to indicate that the input was thoroughly
    // consumed
    let (i, _) = multispace0(i)?;

    Ok((
        i,
        TreeSource {
            tree_defs: trees.into_iter().flatten().collect(),
        },
    ))
}
