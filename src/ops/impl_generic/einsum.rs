//! Generic einsum implementation composing primitive operations.
//!
//! Every input is viewed (without copying) over the full set of labels, with
//! stride 0 wherever the input does not carry a label. The views are multiplied
//! elementwise and the labels missing from the output are summed away.

use crate::error::{Error, Result};
use crate::ops::{BinaryOps, ReduceOps};
use crate::tensor::{Layout, Shape, Strides, Tensor};
use std::collections::{BTreeMap, HashMap};

const ELLIPSIS: &str = "...";

/// One axis of the iteration space.
///
/// `Ellipsis(k)` is the k-th of the broadcast ellipsis dimensions, counted from
/// the left after right-aligning every operand's ellipsis span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Label {
    Named(char),
    Ellipsis(usize),
}

/// Subscripts of one operand, split around an optional `...`.
#[derive(Debug, Clone)]
struct Term {
    before: Vec<char>,
    after: Vec<char>,
    ellipsis: bool,
}

impl Term {
    fn parse(part: &str) -> Result<Self> {
        let (before, after, ellipsis) = match part.find(ELLIPSIS) {
            Some(pos) => (&part[..pos], &part[pos + ELLIPSIS.len()..], true),
            None => (part, "", false),
        };
        if after.contains(ELLIPSIS) {
            return Err(notation_error(format!(
                "einsum subscripts '{part}' contain more than one ellipsis"
            )));
        }

        let letters = |s: &str| -> Result<Vec<char>> {
            s.chars()
                .map(|c| {
                    if c.is_ascii_lowercase() {
                        Ok(c)
                    } else {
                        Err(notation_error(format!(
                            "einsum subscript must be lowercase letter, got '{c}'"
                        )))
                    }
                })
                .collect()
        };

        Ok(Self {
            before: letters(before)?,
            after: letters(after)?,
            ellipsis,
        })
    }

    fn named(&self) -> impl Iterator<Item = char> + '_ {
        self.before.iter().chain(self.after.iter()).copied()
    }

    fn named_len(&self) -> usize {
        self.before.len() + self.after.len()
    }

    /// Expand to one label per dimension given how many dims `...` covers
    /// for this operand and in total.
    fn labels(&self, covered: usize, total: usize) -> Vec<Label> {
        let start = total - covered;
        self.before
            .iter()
            .map(|&c| Label::Named(c))
            .chain((start..total).map(Label::Ellipsis))
            .chain(self.after.iter().map(|&c| Label::Named(c)))
            .collect()
    }
}

/// Parsed einsum notation.
#[derive(Debug, Clone)]
struct EinsumParsed {
    inputs: Vec<Term>,
    /// `None` in implicit mode (no `->`)
    output: Option<Term>,
}

fn notation_error(reason: String) -> Error {
    Error::InvalidArgument {
        arg: "notation",
        reason,
    }
}

/// Parse einsum notation string.
///
/// Supports explicit notation ("ij,jk->ik") and implicit notation ("ij,jk").
fn parse_notation(notation: &str, num_inputs: usize) -> Result<EinsumParsed> {
    let notation: String = notation.chars().filter(|c| !c.is_whitespace()).collect();

    let (inputs_str, output_str) = match notation.find("->") {
        Some(arrow_pos) => (&notation[..arrow_pos], Some(&notation[arrow_pos + 2..])),
        None => (notation.as_str(), None),
    };

    let input_parts: Vec<&str> = inputs_str.split(',').collect();
    if input_parts.len() != num_inputs {
        return Err(notation_error(format!(
            "einsum notation specifies {} inputs but {} were provided",
            input_parts.len(),
            num_inputs
        )));
    }

    let inputs = input_parts
        .iter()
        .map(|part| Term::parse(part))
        .collect::<Result<Vec<_>>>()?;
    let output = output_str.map(Term::parse).transpose()?;

    Ok(EinsumParsed { inputs, output })
}

/// Operand labels, output labels and the size of every label.
struct Resolved {
    input_labels: Vec<Vec<Label>>,
    output_labels: Vec<Label>,
    sizes: HashMap<Label, usize>,
}

/// Bind the parsed subscripts to concrete operand shapes.
fn resolve(parsed: &EinsumParsed, inputs: &[&Tensor]) -> Result<Resolved> {
    let mut covered = Vec::with_capacity(inputs.len());
    for (i, (term, tensor)) in parsed.inputs.iter().zip(inputs).enumerate() {
        let named = term.named_len();
        let ndim = tensor.ndim();
        let fits = if term.ellipsis {
            ndim >= named
        } else {
            ndim == named
        };
        if !fits {
            return Err(notation_error(format!(
                "input {i} has {named} subscripts but tensor has {ndim} dimensions"
            )));
        }
        covered.push(ndim - named);
    }
    let ellipsis_dims = covered.iter().copied().max().unwrap_or(0);

    let mut sizes: HashMap<Label, usize> = HashMap::new();
    let mut input_labels = Vec::with_capacity(inputs.len());
    for ((term, tensor), &cov) in parsed.inputs.iter().zip(inputs).zip(&covered) {
        let labels = term.labels(cov, ellipsis_dims);
        for (&label, &size) in labels.iter().zip(tensor.shape()) {
            match (sizes.get(&label).copied(), label) {
                (None, _) => {
                    sizes.insert(label, size);
                }
                (Some(existing), _) if existing == size => {}
                (Some(existing), Label::Ellipsis(_)) if existing == 1 || size == 1 => {
                    sizes.insert(label, existing.max(size));
                }
                (Some(existing), _) => {
                    return Err(notation_error(format!(
                        "dimension mismatch for label {label:?}: {existing} vs {size}"
                    )));
                }
            }
        }
        input_labels.push(labels);
    }
    for k in 0..ellipsis_dims {
        sizes.entry(Label::Ellipsis(k)).or_insert(1);
    }

    let output_labels = match &parsed.output {
        Some(term) => {
            let mut seen = Vec::new();
            for c in term.named() {
                if !sizes.contains_key(&Label::Named(c)) {
                    return Err(notation_error(format!(
                        "output label '{c}' not found in any input"
                    )));
                }
                if seen.contains(&c) {
                    return Err(notation_error(format!(
                        "output label '{c}' appears more than once"
                    )));
                }
                seen.push(c);
            }
            // without `...` in the output the ellipsis dims are summed out
            let covered = if term.ellipsis { ellipsis_dims } else { 0 };
            term.labels(covered, covered)
        }
        None => {
            // Implicit mode: ellipsis dims, then sorted labels appearing exactly once
            let mut counts: BTreeMap<char, usize> = BTreeMap::new();
            for term in &parsed.inputs {
                for c in term.named() {
                    *counts.entry(c).or_insert(0) += 1;
                }
            }
            (0..ellipsis_dims)
                .map(Label::Ellipsis)
                .chain(
                    counts
                        .into_iter()
                        .filter(|&(_, count)| count == 1)
                        .map(|(c, _)| Label::Named(c)),
                )
                .collect()
        }
    };

    Ok(Resolved {
        input_labels,
        output_labels,
        sizes,
    })
}

/// View `input` over `all_labels` without copying.
///
/// Repeated labels add their strides (diagonal), labels the operand lacks and
/// ellipsis dims it broadcasts from size 1 get stride 0.
fn label_view(
    input: &Tensor,
    labels: &[Label],
    all_labels: &[Label],
    sizes: &HashMap<Label, usize>,
) -> Tensor {
    let shape: Shape = all_labels.iter().map(|l| sizes[l]).collect();
    let mut strides: Strides = all_labels.iter().map(|_| 0isize).collect();

    for ((label, &dim_size), &stride) in labels.iter().zip(input.shape()).zip(input.strides()) {
        let pos = all_labels
            .iter()
            .position(|l| l == label)
            .unwrap_or_default();
        if dim_size == 1 && sizes[label] != 1 {
            continue;
        }
        strides[pos] += stride;
    }

    Tensor::from_parts(
        input.storage().clone(),
        Layout::new(shape, strides, input.layout().offset()),
    )
}

/// Generic einsum implementation using primitive operations.
///
/// Strategy:
/// 1. Bind labels (including broadcast `...` dims) to sizes
/// 2. Order labels as output labels followed by contracted labels
/// 3. Multiply the stride-0-expanded views of all inputs
/// 4. Sum the contracted trailing dims
pub fn einsum_impl<C>(client: &C, notation: &str, inputs: &[&Tensor]) -> Result<Tensor>
where
    C: BinaryOps + ReduceOps,
{
    if inputs.is_empty() {
        return Err(Error::InvalidArgument {
            arg: "inputs",
            reason: "einsum requires at least one input".to_string(),
        });
    }

    let parsed = parse_notation(notation, inputs.len())?;
    let resolved = resolve(&parsed, inputs)?;

    let mut all_labels = resolved.output_labels.clone();
    for label in resolved.input_labels.iter().flatten() {
        if !all_labels.contains(label) {
            all_labels.push(*label);
        }
    }

    let mut views = inputs
        .iter()
        .zip(&resolved.input_labels)
        .map(|(input, labels)| label_view(input, labels, &all_labels, &resolved.sizes));

    let first = views.next().ok_or(Error::Internal("einsum without operands".into()))?;
    let product = views.try_fold(first, |acc, view| client.mul(&acc, &view))?;

    let contracted: Vec<usize> = (resolved.output_labels.len()..all_labels.len()).collect();
    let result = client.sum(&product, &contracted, false)?;

    // Ensure result is contiguous for downstream consumers
    Ok(result.contiguous())
}
