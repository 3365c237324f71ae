//! Macro name to Unicode symbol table.

use std::collections::HashMap;

/// Read-only mapping from macro names (without the backslash) to the
/// Unicode text they typeset as.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    map: HashMap<&'static str, &'static str>,
}

impl SymbolTable {
    /// Build a table from `(name, symbol)` pairs. Later pairs win.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (&'static str, &'static str)>) -> Self {
        Self {
            map: pairs.into_iter().collect(),
        }
    }

    /// Get the standard symbol table (cached).
    pub fn standard() -> &'static Self {
        use std::sync::LazyLock;
        static STANDARD: LazyLock<SymbolTable> =
            LazyLock::new(|| SymbolTable::from_pairs(SYMBOLS.iter().copied()));
        &STANDARD
    }

    /// Look up a macro name.
    pub fn get(&self, name: &str) -> Option<&'static str> {
        self.map.get(name).copied()
    }
}

// `mathbf` is deliberately absent: it is handled as a wrapper by the resolver.
static SYMBOLS: &[(&str, &str)] = &[
    // Greek lowercase
    ("alpha", "\u{3b1}"),
    ("beta", "\u{3b2}"),
    ("gamma", "\u{3b3}"),
    ("delta", "\u{3b4}"),
    ("epsilon", "\u{3f5}"),
    ("varepsilon", "\u{3b5}"),
    ("zeta", "\u{3b6}"),
    ("eta", "\u{3b7}"),
    ("theta", "\u{3b8}"),
    ("vartheta", "\u{3d1}"),
    ("iota", "\u{3b9}"),
    ("kappa", "\u{3ba}"),
    ("lambda", "\u{3bb}"),
    ("mu", "\u{3bc}"),
    ("nu", "\u{3bd}"),
    ("xi", "\u{3be}"),
    ("pi", "\u{3c0}"),
    ("varpi", "\u{3d6}"),
    ("rho", "\u{3c1}"),
    ("varrho", "\u{3f1}"),
    ("sigma", "\u{3c3}"),
    ("varsigma", "\u{3c2}"),
    ("tau", "\u{3c4}"),
    ("upsilon", "\u{3c5}"),
    ("phi", "\u{3d5}"),
    ("varphi", "\u{3c6}"),
    ("chi", "\u{3c7}"),
    ("psi", "\u{3c8}"),
    ("omega", "\u{3c9}"),
    // Greek uppercase
    ("Gamma", "\u{393}"),
    ("Delta", "\u{394}"),
    ("Theta", "\u{398}"),
    ("Lambda", "\u{39b}"),
    ("Xi", "\u{39e}"),
    ("Pi", "\u{3a0}"),
    ("Sigma", "\u{3a3}"),
    ("Upsilon", "\u{3a5}"),
    ("Phi", "\u{3a6}"),
    ("Psi", "\u{3a8}"),
    ("Omega", "\u{3a9}"),
    // Binary operators
    ("pm", "\u{b1}"),
    ("mp", "\u{2213}"),
    ("times", "\u{d7}"),
    ("div", "\u{f7}"),
    ("cdot", "\u{22c5}"),
    ("ast", "\u{2217}"),
    ("star", "\u{22c6}"),
    ("circ", "\u{2218}"),
    ("bullet", "\u{2219}"),
    ("oplus", "\u{2295}"),
    ("ominus", "\u{2296}"),
    ("otimes", "\u{2297}"),
    ("oslash", "\u{2298}"),
    ("odot", "\u{2299}"),
    ("cap", "\u{2229}"),
    ("cup", "\u{222a}"),
    ("wedge", "\u{2227}"),
    ("land", "\u{2227}"),
    ("vee", "\u{2228}"),
    ("lor", "\u{2228}"),
    ("setminus", "\u{2216}"),
    // Relations
    ("leq", "\u{2264}"),
    ("le", "\u{2264}"),
    ("geq", "\u{2265}"),
    ("ge", "\u{2265}"),
    ("neq", "\u{2260}"),
    ("ne", "\u{2260}"),
    ("ll", "\u{226a}"),
    ("gg", "\u{226b}"),
    ("approx", "\u{2248}"),
    ("equiv", "\u{2261}"),
    ("sim", "\u{223c}"),
    ("simeq", "\u{2243}"),
    ("cong", "\u{2245}"),
    ("propto", "\u{221d}"),
    ("perp", "\u{22a5}"),
    ("parallel", "\u{2225}"),
    ("mid", "\u{2223}"),
    ("in", "\u{2208}"),
    ("notin", "\u{2209}"),
    ("ni", "\u{220b}"),
    ("subset", "\u{2282}"),
    ("supset", "\u{2283}"),
    ("subseteq", "\u{2286}"),
    ("supseteq", "\u{2287}"),
    ("vdash", "\u{22a2}"),
    ("models", "\u{22a8}"),
    // Arrows
    ("leftarrow", "\u{2190}"),
    ("gets", "\u{2190}"),
    ("rightarrow", "\u{2192}"),
    ("to", "\u{2192}"),
    ("uparrow", "\u{2191}"),
    ("downarrow", "\u{2193}"),
    ("leftrightarrow", "\u{2194}"),
    ("Leftarrow", "\u{21d0}"),
    ("Rightarrow", "\u{21d2}"),
    ("Leftrightarrow", "\u{21d4}"),
    ("iff", "\u{21d4}"),
    ("implies", "\u{21d2}"),
    ("mapsto", "\u{21a6}"),
    ("longrightarrow", "\u{27f6}"),
    ("longleftarrow", "\u{27f5}"),
    // Large operators
    ("sum", "\u{2211}"),
    ("prod", "\u{220f}"),
    ("coprod", "\u{2210}"),
    ("int", "\u{222b}"),
    ("iint", "\u{222c}"),
    ("oint", "\u{222e}"),
    ("bigcup", "\u{22c3}"),
    ("bigcap", "\u{22c2}"),
    // Miscellaneous
    ("infty", "\u{221e}"),
    ("partial", "\u{2202}"),
    ("nabla", "\u{2207}"),
    ("forall", "\u{2200}"),
    ("exists", "\u{2203}"),
    ("neg", "\u{ac}"),
    ("lnot", "\u{ac}"),
    ("emptyset", "\u{2205}"),
    ("varnothing", "\u{2205}"),
    ("hbar", "\u{210f}"),
    ("ell", "\u{2113}"),
    ("Re", "\u{211c}"),
    ("Im", "\u{2111}"),
    ("aleph", "\u{2135}"),
    ("prime", "\u{2032}"),
    ("angle", "\u{2220}"),
    ("triangle", "\u{25b3}"),
    ("surd", "\u{221a}"),
    ("ldots", "\u{2026}"),
    ("dots", "\u{2026}"),
    ("cdots", "\u{22ef}"),
    ("vdots", "\u{22ee}"),
    ("ddots", "\u{22f1}"),
    ("langle", "\u{27e8}"),
    ("rangle", "\u{27e9}"),
    ("lceil", "\u{2308}"),
    ("rceil", "\u{2309}"),
    ("lfloor", "\u{230a}"),
    ("rfloor", "\u{230b}"),
    ("quad", "\u{2003}"),
    ("qquad", "\u{2003}\u{2003}"),
];
