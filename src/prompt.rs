use crate::normalize::NormalizedImage;
use serde::{Deserialize, Serialize};

/// Instruction sent alongside every image. The model must answer with one of
/// the two JSON shapes and nothing else.
pub const INSTRUCTION: &str = r#"请严格按照以下要求返回结果：
1. 判断图片是否包含生物（动物、植物、微生物等）；
2. 若是生物，请精确识别到物种级别，并返回 JSON 格式：{
   "is_biological": true,
   "name": "生物常用名称（如：德国牧羊犬）",
   "scientific_name": "科学学名（如：Canis lupus familiaris）",
   "type": "详细分类（如：mammal|bird|flower|tree等）",
   "confidence": 0.99（0-1之间的置信度）,
   "habitat": "分布区域",
   "description": "详细生物学描述，包括形态特征、生活习性、分布范围等（至少50字）"
}；
3. 若不是生物或无法识别，返回 JSON 格式：{"is_biological": false, "message": "图片与生物无关或无法识别"}；
4. 仅返回 JSON 字符串，不要添加任何额外内容（如解释、换行等）。"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
    #[serde(rename = "text")]
    Text { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

/// The image part followed by the instruction part, in that order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionPrompt {
    pub image: ContentPart,
    pub instruction: ContentPart,
}

impl RecognitionPrompt {
    pub fn into_messages(self) -> Vec<Message> {
        vec![Message {
            role: Role::User,
            content: vec![self.image, self.instruction],
        }]
    }
}

pub fn build_prompt(image: &NormalizedImage) -> RecognitionPrompt {
    // rewrapped as png whatever the source format
    let url = format!("data:image/png;base64,{}", image.as_str());
    RecognitionPrompt {
        image: ContentPart::ImageUrl {
            image_url: ImageUrl { url },
        },
        instruction: ContentPart::Text {
            text: INSTRUCTION.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use serde_json::json;

    #[test]
    fn test_image_is_rewrapped_as_png() {
        let image = normalize(Some("data:image/jpeg;base64,/9j/4AAQ")).unwrap();
        let prompt = build_prompt(&image);
        assert_eq!(
            prompt.image,
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: "data:image/png;base64,/9j/4AAQ".to_string()
                }
            }
        );
    }

    #[test]
    fn test_instruction_describes_both_shapes() {
        let image = normalize(Some("abc123==")).unwrap();
        let prompt = build_prompt(&image);
        let ContentPart::Text { text } = &prompt.instruction else {
            panic!("instruction must be a text part");
        };
        assert!(text.contains(r#""is_biological": true"#));
        assert!(text.contains(r#""is_biological": false"#));
        assert!(text.contains("scientific_name"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let image = normalize(Some("abc123==")).unwrap();
        assert_eq!(build_prompt(&image), build_prompt(&image));
    }

    #[test]
    fn test_messages_wire_shape() {
        let image = normalize(Some("abc123==")).unwrap();
        let messages = build_prompt(&image).into_messages();
        let value = serde_json::to_value(&messages).unwrap();
        assert_eq!(value[0]["role"], json!("user"));
        assert_eq!(value[0]["content"][0]["type"], json!("image_url"));
        assert_eq!(
            value[0]["content"][0]["image_url"]["url"],
            json!("data:image/png;base64,abc123==")
        );
        assert_eq!(value[0]["content"][1]["type"], json!("text"));
        assert_eq!(value[0]["content"][1]["text"], json!(INSTRUCTION));
    }
}
