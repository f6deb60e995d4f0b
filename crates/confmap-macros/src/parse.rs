//! Parsing of `#[confmap(...)]` attributes.

use syn::{
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    spanned::Spanned,
    Attribute, Expr, ExprLit, ExprUnary, Lit, Meta, Path, Token, UnOp,
};

/// How decode names are derived from field identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameRule {
    /// `max_conns`
    SnakeCase,
    /// `maxConns`
    CamelCase,
    /// `MaxConns`
    PascalCase,
    /// `max-conns`
    KebabCase,
}

impl RenameRule {
    fn parse(value: &str, span: proc_macro2::Span) -> syn::Result<Self> {
        match value {
            "snake_case" => Ok(Self::SnakeCase),
            "camelCase" => Ok(Self::CamelCase),
            "PascalCase" => Ok(Self::PascalCase),
            "kebab-case" => Ok(Self::KebabCase),
            _ => Err(syn::Error::new(
                span,
                format!(
                    "unknown rename rule `{value}`, expected one of \
                     snake_case, camelCase, PascalCase, kebab-case"
                ),
            )),
        }
    }

    /// Applies the rule to a snake_case identifier.
    pub fn apply(self, ident: &str) -> String {
        match self {
            Self::SnakeCase => ident.to_owned(),
            Self::KebabCase => ident.replace('_', "-"),
            Self::CamelCase | Self::PascalCase => {
                let mut out = String::with_capacity(ident.len());
                let mut upper = self == Self::PascalCase;
                for ch in ident.chars() {
                    if ch == '_' {
                        upper = !out.is_empty();
                    } else if upper {
                        out.extend(ch.to_uppercase());
                        upper = false;
                    } else {
                        out.push(ch);
                    }
                }
                out
            }
        }
    }
}

/// Container-level attributes.
#[derive(Debug, Default)]
pub struct ContainerAttrs {
    /// Rule for fields without an explicit name.
    pub rename_all: Option<RenameRule>,
    /// Path of the runtime crate in generated code.
    pub krate: Option<Path>,
}

impl ContainerAttrs {
    /// Collects every `#[confmap(...)]` attribute on the container.
    pub fn from_attributes(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();
        for meta in confmap_metas(attrs)? {
            parsed.apply(meta)?;
        }
        Ok(parsed)
    }

    /// Decode name for a field identifier.
    pub fn tag_for(&self, ident: &str) -> String {
        self.rename_all
            .map_or_else(|| ident.to_owned(), |rule| rule.apply(ident))
    }

    fn apply(&mut self, meta: Meta) -> syn::Result<()> {
        let nv = match meta {
            Meta::NameValue(nv) => nv,
            other => return Err(syn::Error::new(other.span(), "expected name = value")),
        };
        let key = meta_key(&nv.path)?;
        let value = string_value(&nv.value)?;

        match key.as_str() {
            "rename_all" => {
                set_once(&mut self.rename_all, RenameRule::parse(&value, nv.value.span())?, &nv.path)
            }
            "crate" => {
                let path: Path = syn::parse_str(&value)
                    .map_err(|e| syn::Error::new(nv.value.span(), e.to_string()))?;
                set_once(&mut self.krate, path, &nv.path)
            }
            _ => Err(syn::Error::new(
                nv.path.span(),
                format!("unknown container attribute: {key}"),
            )),
        }
    }
}

impl Parse for ContainerAttrs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut parsed = Self::default();
        for meta in Punctuated::<Meta, Token![,]>::parse_terminated(input)? {
            parsed.apply(meta)?;
        }
        Ok(parsed)
    }
}

/// Field-level attributes.
#[derive(Debug, Default)]
pub struct FieldAttrs {
    /// Explicit decode name.
    pub name: Option<String>,
    /// Default literal, normalized to its string form.
    pub default: Option<String>,
    /// Exclude the field.
    pub skip: bool,
}

impl FieldAttrs {
    /// Collects every `#[confmap(...)]` attribute on a field.
    pub fn from_attributes(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();
        for meta in confmap_metas(attrs)? {
            parsed.apply(meta)?;
        }
        Ok(parsed)
    }

    fn apply(&mut self, meta: Meta) -> syn::Result<()> {
        match meta {
            Meta::Path(path) => {
                if meta_key(&path)? == "skip" {
                    self.skip = true;
                    Ok(())
                } else {
                    Err(syn::Error::new(path.span(), "expected `skip` or name = value"))
                }
            }
            Meta::NameValue(nv) => {
                let key = meta_key(&nv.path)?;
                match key.as_str() {
                    "name" => set_once(&mut self.name, string_value(&nv.value)?, &nv.path),
                    "default" => set_once(&mut self.default, literal_value(&nv.value)?, &nv.path),
                    _ => Err(syn::Error::new(
                        nv.path.span(),
                        format!("unknown field attribute: {key}"),
                    )),
                }
            }
            Meta::List(list) => Err(syn::Error::new(list.span(), "unexpected nested list")),
        }
    }
}

impl Parse for FieldAttrs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut parsed = Self::default();
        for meta in Punctuated::<Meta, Token![,]>::parse_terminated(input)? {
            parsed.apply(meta)?;
        }
        Ok(parsed)
    }
}

fn confmap_metas(attrs: &[Attribute]) -> syn::Result<Vec<Meta>> {
    let mut metas = Vec::new();
    for attr in attrs.iter().filter(|a| a.path().is_ident("confmap")) {
        let list = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
        metas.extend(list);
    }
    Ok(metas)
}

fn meta_key(path: &Path) -> syn::Result<String> {
    path.get_ident()
        .map(ToString::to_string)
        .ok_or_else(|| syn::Error::new(path.span(), "expected identifier"))
}

fn set_once<T>(slot: &mut Option<T>, value: T, path: &Path) -> syn::Result<()> {
    if slot.is_some() {
        return Err(syn::Error::new(path.span(), "duplicate attribute"));
    }
    *slot = Some(value);
    Ok(())
}

fn string_value(expr: &Expr) -> syn::Result<String> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Ok(s.value()),
        _ => Err(syn::Error::new(expr.span(), "expected string literal")),
    }
}

/// Accepts `"42"`, `42`, `-1`, `0.5` and `true` as default literals.
fn literal_value(expr: &Expr) -> syn::Result<String> {
    match expr {
        Expr::Lit(ExprLit { lit, .. }) => match lit {
            Lit::Str(s) => Ok(s.value()),
            Lit::Int(i) => Ok(i.base10_digits().to_owned()),
            Lit::Float(f) => Ok(f.base10_digits().to_owned()),
            Lit::Bool(b) => Ok(b.value.to_string()),
            _ => Err(syn::Error::new(lit.span(), "unsupported default literal")),
        },
        Expr::Unary(ExprUnary {
            op: UnOp::Neg(_),
            expr: inner,
            ..
        }) => match &**inner {
            Expr::Lit(ExprLit {
                lit: Lit::Int(_) | Lit::Float(_),
                ..
            }) => Ok(format!("-{}", literal_value(inner)?)),
            _ => Err(syn::Error::new(expr.span(), "expected numeric literal")),
        },
        _ => Err(syn::Error::new(expr.span(), "expected literal")),
    }
}
