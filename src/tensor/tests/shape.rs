use crate::assert_err;
use crate::errors::TensorError;
use crate::tensor::Tensor;

#[test]
fn test_compare_shapes() {
    let tensor1 = Tensor::new(&[1., 2., 3., 4.], &[1, 4]);
    let tensor2 = Tensor::new(&[1., 2., 3., 4.], &[4]);
    assert!(!tensor1.is_same_shape(&tensor2));
    assert!(tensor1.is_same_shape(&Tensor::zeros(&[1, 4])));
}

#[test]
fn test_is_scalar_and_number() {
    assert_eq!(Tensor::scalar(3.).number(), Some(3.));
    assert_eq!(Tensor::new(&[1.], &[1, 1, 1]).number(), Some(1.));
    assert_eq!(Tensor::new(&[1., 2.], &[2]).number(), None);
}

#[test]
fn test_try_new_and_reshape_errors() {
    assert_err!(
        Tensor::try_new(&[1., 2., 3.], &[2, 2]),
        TensorError::ReshapeMismatch { expected: 4, got: 3, .. }
    );
    let t = Tensor::new(&[1., 2., 3., 4., 5., 6.], &[2, 3]);
    assert_eq!(t.reshape(&[3, 2]).shape(), &[3, 2]);
    assert_err!(t.try_reshape(&[4, 2]), TensorError::ReshapeMismatch { .. });
}

#[test]
fn test_transpose() {
    let t = Tensor::new(&[1., 2., 3., 4., 5., 6.], &[2, 3]);
    let tt = t.transpose();
    assert_eq!(tt.shape(), &[3, 2]);
    assert_eq!(tt.get(&[2, 0]).unwrap(), 3.);
    assert_eq!(tt.transpose(), t);
}

#[test]
fn test_concat_slice_assign_axis1() {
    let a = Tensor::new(&[1., 2., 3., 4.], &[2, 2]);
    let b = Tensor::new(&[5., 6.], &[2, 1]);
    let c = Tensor::concat_axis1(&[&a, &b]).unwrap();
    assert_eq!(c, Tensor::new(&[1., 2., 5., 3., 4., 6.], &[2, 3]));
    assert_eq!(c.slice_axis1(2, 3).unwrap(), b);
    assert_err!(
        c.slice_axis1(2, 4),
        TensorError::SliceOutOfRange { start: 2, end: 4, len: 3 }
    );

    let mut z = Tensor::zeros(&[2, 3]);
    z.assign_axis1(1, &a).unwrap();
    assert_eq!(z, Tensor::new(&[0., 1., 2., 0., 3., 4.], &[2, 3]));
    assert_err!(Tensor::concat_axis1(&[]), TensorError::EmptyList);
}

#[test]
fn test_get_set() {
    let mut t = Tensor::zeros(&[2, 2]);
    t.set(&[1, 0], 7.).unwrap();
    assert_eq!(t.get(&[1, 0]).unwrap(), 7.);
    assert_eq!(t.get_flat(2), Some(7.));
    assert_err!(t.get(&[2, 0]), TensorError::IndexOutOfRange { .. });
}

#[test]
fn test_display() {
    let matrix = Tensor::new(&[1., 2., 3., 4.], &[2, 2]);
    assert_eq!(
        matrix.to_string(),
        "[[  1.0000,   2.0000]\n [  3.0000,   4.0000]]\n形状: [2, 2]"
    );
    let image = Tensor::zeros(&[1, 1, 2, 2]);
    assert!(image.to_string().starts_with("<阶数大于二的张量不展示具体数据>"));
}
