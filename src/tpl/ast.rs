use crate::error::{Result, TemplateError};
use crate::tpl::expr::{self, Expr, ForHeader};
use crate::tpl::statement::{ControlStatement, Keyword, NOOP, pad, quote};
use crate::tpl::substitute::Segment;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Appends one line to the output buffer.
    Emit(Vec<Segment>),
    /// Nested program built from a multi-line substituted value.
    Block(Vec<Node>),
    If {
        branches: Vec<(Expr, Vec<Node>)>,
        otherwise: Option<Vec<Node>>,
    },
    For {
        header: ForHeader,
        body: Vec<Node>,
    },
}

/// One statement after substitution, ready to be assembled.
#[derive(Debug, Clone)]
pub enum Step {
    Emit(Vec<Segment>),
    Block(Vec<Node>),
    Control(ControlStatement),
}

enum Frame {
    If {
        branches: Vec<(Expr, Vec<Node>)>,
        otherwise: Option<Vec<Node>>,
    },
    For {
        header: ForHeader,
        body: Vec<Node>,
    },
}

impl Frame {
    fn body(&mut self) -> &mut Vec<Node> {
        match self {
            Frame::If {
                otherwise: Some(body),
                ..
            } => body,
            Frame::If { branches, .. } => match branches.last_mut() {
                Some((_, body)) => body,
                None => unreachable!("if frame always holds its first branch"),
            },
            Frame::For { body, .. } => body,
        }
    }

    fn into_node(self) -> Node {
        match self {
            Frame::If {
                branches,
                otherwise,
            } => Node::If {
                branches,
                otherwise,
            },
            Frame::For { header, body } => Node::For { header, body },
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Frame::If { .. } => "if",
            Frame::For { .. } => "for",
        }
    }
}

fn unbalanced(reason: impl Into<String>) -> TemplateError {
    TemplateError::Evaluation(reason.into())
}

/// The assembled, evaluable form of a template.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    nodes: Vec<Node>,
}

impl Program {
    /// Builds the node tree from substituted statements. Unbalanced blocks and
    /// malformed conditions fail here, before anything is emitted.
    pub fn assemble(steps: Vec<Step>) -> Result<Self> {
        let mut root: Vec<Node> = Vec::new();
        let mut stack: Vec<Frame> = Vec::new();

        for step in steps {
            let node = match step {
                Step::Emit(segments) => Node::Emit(segments),
                Step::Block(nodes) => Node::Block(nodes),
                Step::Control(control) => {
                    match apply_control(&control, &mut stack)? {
                        Some(node) => node,
                        None => continue,
                    }
                }
            };
            match stack.last_mut() {
                Some(frame) => frame.body().push(node),
                None => root.push(node),
            }
        }

        if let Some(frame) = stack.last() {
            return Err(unbalanced(format!(
                "`{}` block is never closed with `end`",
                frame.name()
            )));
        }
        Ok(Self { nodes: root })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }

    /// Imperative listing of the program, one instruction per line.
    pub fn listing(&self, buffer: &str) -> String {
        let mut out = String::new();
        list_nodes(&self.nodes, 0, buffer, &mut out);
        out
    }
}

/// Opens, switches or closes a frame. Returns the node completed by `end`.
fn apply_control(control: &ControlStatement, stack: &mut Vec<Frame>) -> Result<Option<Node>> {
    let condition = control.condition().unwrap_or_default();
    match control.keyword() {
        Keyword::If => {
            stack.push(Frame::If {
                branches: vec![(expr::parse(condition)?, Vec::new())],
                otherwise: None,
            });
            Ok(None)
        }
        Keyword::For => {
            stack.push(Frame::For {
                header: expr::parse_for(condition)?,
                body: Vec::new(),
            });
            Ok(None)
        }
        Keyword::Elif => match stack.last_mut() {
            Some(Frame::If {
                branches,
                otherwise: None,
            }) => {
                branches.push((expr::parse(condition)?, Vec::new()));
                Ok(None)
            }
            Some(Frame::If { .. }) => Err(unbalanced("`elif` after `else`")),
            _ => Err(unbalanced("`elif` outside of an `if` block")),
        },
        Keyword::Else => match stack.last_mut() {
            Some(Frame::If {
                otherwise: otherwise @ None,
                ..
            }) => {
                *otherwise = Some(Vec::new());
                Ok(None)
            }
            Some(Frame::If { .. }) => Err(unbalanced("duplicate `else`")),
            _ => Err(unbalanced("`else` outside of an `if` block")),
        },
        Keyword::End => match stack.pop() {
            Some(frame) => Ok(Some(frame.into_node())),
            None => Err(unbalanced("`end` without an open block")),
        },
    }
}

fn list_nodes(nodes: &[Node], indent: i32, buffer: &str, out: &mut String) {
    let line = |out: &mut String, indent: i32, text: &str| {
        let _ = writeln!(out, "{}{}", pad(indent), text);
    };

    for node in nodes {
        match node {
            Node::Emit(segments) => {
                let mut text = String::new();
                for seg in segments {
                    match seg {
                        Segment::Text(t) => text.push_str(t),
                        Segment::Deferred(d) => text.push_str(d.stripped()),
                    }
                }
                line(out, indent, &format!("{}.append({})", buffer, quote(&text)));
            }
            Node::Block(children) => list_nodes(children, indent, buffer, out),
            Node::If {
                branches,
                otherwise,
            } => {
                for (i, (cond, body)) in branches.iter().enumerate() {
                    let kw = if i == 0 { "if" } else { "elif" };
                    line(out, indent, &format!("{} {:?}:", kw, cond));
                    list_body(body, indent + 2, buffer, out);
                }
                if let Some(body) = otherwise {
                    line(out, indent, "else:");
                    list_body(body, indent + 2, buffer, out);
                }
            }
            Node::For { header, body } => {
                line(
                    out,
                    indent,
                    &format!("for {} in {:?}:", header.targets.join(", "), header.seq),
                );
                list_body(body, indent + 2, buffer, out);
            }
        }
    }
}

fn list_body(body: &[Node], indent: i32, buffer: &str, out: &mut String) {
    if body.is_empty() {
        let _ = writeln!(out, "{}{}", pad(indent), NOOP);
    } else {
        list_nodes(body, indent, buffer, out);
    }
}
