//! Minimal PDF builder shared by unit and integration tests.
#![allow(dead_code)]

/// Standard 14 font without an explicit encoding.
pub const HELVETICA: &str = "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>";

/// ToUnicode map sending the two-byte codes `<0024>` and `<0025>` to `H` and `i`.
pub const HI_TO_UNICODE: &str = "/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo
<< /Registry (Adobe)
/Ordering (UCS)
/Supplement 0
>> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
2 beginbfchar
<0024> <0048>
<0025> <0069>
endbfchar
endcmap
CMapName currentdict /CMap defineresource pop
end
end";

/// Builds a PDF whose pages all share one font resource dictionary.
pub struct PdfFixture {
    objects: Vec<String>,
    fonts: Vec<(String, usize)>,
    contents: Vec<usize>,
}

impl Default for PdfFixture {
    fn default() -> Self {
        Self {
            objects: vec!["<< /Type /Catalog /Pages 2 0 R >>".to_string(), String::new()],
            fonts: Vec::new(),
            contents: Vec::new(),
        }
    }
}

impl PdfFixture {
    /// Add an indirect object and return its object number.
    pub fn add_object(&mut self, body: impl Into<String>) -> usize {
        self.objects.push(body.into());
        self.objects.len()
    }

    /// Add an unfiltered stream object and return its object number.
    pub fn add_stream(&mut self, content: &str) -> usize {
        self.add_object(format!(
            "<< /Length {} >>\nstream\n{content}\nendstream",
            content.len()
        ))
    }

    /// Register `dictionary` as font resource `/name` on every page.
    pub fn add_font(&mut self, name: &str, dictionary: impl Into<String>) -> &mut Self {
        let id = self.add_object(dictionary);
        self.fonts.push((name.to_string(), id));
        self
    }

    /// Append a page drawing `content`.
    pub fn add_page(&mut self, content: &str) -> &mut Self {
        let id = self.add_stream(content);
        self.contents.push(id);
        self
    }

    /// Serialize the document with a correct xref table.
    pub fn build(&self) -> Vec<u8> {
        let mut objects = self.objects.clone();
        let fonts: Vec<String> = self
            .fonts
            .iter()
            .map(|(name, id)| format!("/{name} {id} 0 R"))
            .collect();
        let mut kids = Vec::new();
        for content_id in &self.contents {
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {content_id} 0 R /Resources << /Font << {} >> >> >>",
                fonts.join(" ")
            ));
            kids.push(format!("{} 0 R", objects.len()));
        }
        objects[1] = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            kids.len()
        );

        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (index, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", index + 1).as_bytes());
        }
        let xref_start = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
        out.extend_from_slice(b"0000000000 65535 f \n");
        for offset in offsets {
            out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_start}\n%%EOF\n",
                objects.len() + 1
            )
            .as_bytes(),
        );
        out
    }
}

/// One Helvetica page per entry, each showing its text with a single `Tj`.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let mut fixture = PdfFixture::default();
    fixture.add_font("F1", HELVETICA);
    for text in pages {
        fixture.add_page(&format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET"));
    }
    fixture.build()
}
