//! Byte ranges of the functions in a file, used to name the function that
//! encloses a call site.

use tree_sitter::Node;

use crate::syntax::SourceFile;

/// Suffix for function literals.
pub const ANONYMOUS: &str = "<anonymous>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRange {
    pub start: usize,
    pub end: usize,
    pub package: String,
    /// `Func`, `Type.Method`, or `<Parent>.<anonymous>`.
    pub name: String,
}

impl FunctionRange {
    fn contains(&self, start: usize, end: usize) -> bool {
        start >= self.start && end <= self.end
    }
}

/// All function ranges of one parsed file, ordered by start offset.
#[derive(Debug, Clone, Default)]
pub struct FunctionIndex {
    ranges: Vec<FunctionRange>,
}

impl FunctionIndex {
    pub fn build(file: &SourceFile) -> Self {
        let root = file.root();
        let package = file.package_name.as_str();

        let mut ranges: Vec<FunctionRange> = Vec::new();
        let mut cursor = root.walk();
        for decl in root.named_children(&mut cursor) {
            if !matches!(decl.kind(), "function_declaration" | "method_declaration") {
                continue;
            }
            let Some(name) = decl.child_by_field_name("name") else {
                continue;
            };
            let name = file.node_text(name);
            let name = match receiver_type_name(decl, file) {
                Some(recv) => format!("{recv}.{name}"),
                None => name.to_string(),
            };
            ranges.push(FunctionRange {
                start: decl.start_byte(),
                end: decl.end_byte(),
                package: package.to_string(),
                name,
            });
        }

        let mut literals = Vec::new();
        collect_func_literals(root, &mut literals);
        literals.sort_by_key(|&(start, _)| start);

        // Literals get the tightest range already known, including earlier
        // literals, so nesting produces `F.<anonymous>.<anonymous>`.
        for (start, end) in literals {
            let name = ranges
                .iter()
                .filter(|r| r.contains(start, end))
                .max_by_key(|r| r.start)
                .map_or_else(|| ANONYMOUS.to_string(), |p| format!("{}.{ANONYMOUS}", p.name));
            ranges.push(FunctionRange { start, end, package: package.to_string(), name });
        }

        ranges.sort_by_key(|r| r.start);
        Self { ranges }
    }

    pub fn ranges(&self) -> &[FunctionRange] {
        &self.ranges
    }

    /// Innermost range containing `offset` (end inclusive).
    pub fn resolve(&self, offset: usize) -> Option<&FunctionRange> {
        self.ranges
            .iter()
            .filter(|r| offset >= r.start && offset <= r.end)
            .max_by_key(|r| r.start)
    }
}

fn collect_func_literals(node: Node, out: &mut Vec<(usize, usize)>) {
    if node.kind() == "func_literal" {
        out.push((node.start_byte(), node.end_byte()));
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_func_literals(child, out);
    }
}

/// Base type name of a method receiver: `T`, `*T`, `T[P]` and `*T[P]` all give `T`.
fn receiver_type_name(decl: Node, file: &SourceFile) -> Option<String> {
    let receiver = decl.child_by_field_name("receiver")?;
    let mut cursor = receiver.walk();
    let param = receiver
        .named_children(&mut cursor)
        .find(|n| n.kind() == "parameter_declaration")?;
    let mut ty = param.child_by_field_name("type")?;
    loop {
        match ty.kind() {
            "pointer_type" | "parenthesized_type" => {
                let mut c = ty.walk();
                ty = ty.named_children(&mut c).find(|n| n.kind() != "comment")?;
            }
            "generic_type" => ty = ty.child_by_field_name("type")?,
            "type_identifier" => return Some(file.node_text(ty).to_string()),
            _ => return Some(String::new()),
        }
    }
}
